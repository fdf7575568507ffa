use actix_web::dev::Server;
use actix_web::{error, http, web, App, HttpResponse, HttpServer};
use actix_cors::Cors;
use serde_json::json;
use sqlx::SqlitePool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub mod auth;
pub mod config;
pub mod db;
mod handlers;
pub mod middleware;
pub mod models;
mod routes;
pub mod services;
pub mod telemetry;
pub mod utils;

use crate::config::jwt::JwtSettings;
use crate::routes::init_routes;
use crate::services::{ChatService, PasswordResetService, SessionRegistry};

pub fn run(
    listener: TcpListener,
    db_pool: SqlitePool,
    jwt_settings: JwtSettings,
    chat_service: ChatService,
    session_registry: SessionRegistry,
    reset_service: PasswordResetService,
    allowed_origins: Vec<String>,
) -> Result<Server, std::io::Error> {
    // Wrap using web::Data, which boils down to an Arc smart pointer
    let db_pool_data = web::Data::new(db_pool);
    let jwt_settings = web::Data::new(jwt_settings);
    let chat_service = web::Data::new(chat_service);
    let session_registry = web::Data::new(session_registry);
    let reset_service = web::Data::new(reset_service);

    let server = HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::AUTHORIZATION,
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
                http::header::UPGRADE,
                http::header::CONNECTION,
            ])
            .supports_credentials()
            .max_age(3600);

        // Malformed bodies answer with the same {"error": ...} shape as the handlers
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            let message = err.to_string();
            error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(json!({ "error": message })),
            )
            .into()
        });

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(json_config)
            // Get a pointer copy and attach it to the application state
            .app_data(db_pool_data.clone())
            .app_data(jwt_settings.clone())
            .app_data(chat_service.clone())
            .app_data(session_registry.clone())
            .app_data(reset_service.clone())
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}

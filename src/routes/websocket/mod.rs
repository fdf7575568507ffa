mod auth;
mod connection;
mod messages;

use actix_web::{get, http::StatusCode, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use sqlx::SqlitePool;

use crate::config::jwt::JwtSettings;
use crate::db::helpers::error_response;
use crate::db::users::find_active_user_by_email;
use crate::services::chat_service::ChatUser;
use crate::services::{ChatService, SessionRegistry};

pub use auth::authenticate;
pub use connection::ChatConnection;
pub use messages::TokenQuery;

/// Real-time chat and device push channel.
#[get("/ws")]
pub async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<TokenQuery>,
    pool: web::Data<SqlitePool>,
    jwt_settings: web::Data<JwtSettings>,
    chat: web::Data<ChatService>,
    sessions: web::Data<SessionRegistry>,
) -> Result<HttpResponse, Error> {
    let claims = match authenticate(&req, &query, &jwt_settings) {
        Ok(claims) => claims,
        Err(message) => return Ok(error_response(StatusCode::UNAUTHORIZED, message)),
    };

    let user = match find_active_user_by_email(&pool, claims.email()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!("Real-time token for unknown or inactive user {}", claims.email());
            return Ok(error_response(StatusCode::UNAUTHORIZED, "User not found"));
        }
        Err(e) => {
            tracing::error!("Database error: {}", e);
            return Ok(error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error"));
        }
    };

    let chat_user = ChatUser {
        id: user.id,
        email: user.email,
        name: user.name,
    };
    tracing::info!("Real-time connection accepted for {}", chat_user.email);
    ws::start(ChatConnection::new(chat_user, chat, sessions), &req, stream)
}

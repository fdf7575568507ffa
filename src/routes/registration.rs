use actix_web::{post, web, HttpResponse};
use sqlx::SqlitePool;

use crate::config::jwt::JwtSettings;
use crate::handlers::registration_handler::register_user;
use crate::models::user::RegistrationRequest;

#[post("/api/register")]
async fn register(
    user_form: web::Json<RegistrationRequest>,
    pool: web::Data<SqlitePool>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    register_user(user_form, pool, jwt_settings).await
}

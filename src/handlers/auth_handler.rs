// src/handlers/auth_handler.rs
use actix_web::{http::StatusCode, web, HttpResponse};
use secrecy::ExposeSecret;
use sqlx::SqlitePool;

use crate::auth::jwt::generate_token;
use crate::config::jwt::JwtSettings;
use crate::db::helpers::error_response;
use crate::db::users::find_active_user_by_email;
use crate::middleware::auth::TokenScope;
use crate::models::auth::{LoginRequest, LoginResponse};
use crate::models::user::UserSummary;
use crate::utils::password::verify_password;
use crate::utils::validation::normalize_email;

#[tracing::instrument(
    name = "Login user attempt",
    skip(login_form, pool, jwt_settings),
    fields(
        email = %login_form.email
    )
)]
pub async fn login_user(
    login_form: web::Json<LoginRequest>,
    pool: web::Data<SqlitePool>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    let email = normalize_email(&login_form.email);
    if email.is_empty() || login_form.password.expose_secret().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Email and password are required");
    }

    // Inactive accounts are invisible here, so they fail like a wrong password
    let user = match find_active_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::info!("User not found or invalid credentials");
            return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials");
        }
        Err(e) => {
            tracing::error!("Database error occurred: {:?}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed. Please try again.");
        }
    };

    if !verify_password(login_form.password.expose_secret(), &user.password_hash) {
        tracing::info!("Invalid password");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let token = match generate_token(&user.email, TokenScope::Session, &jwt_settings) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Error generating JWT token: {:?}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed. Please try again.");
        }
    };

    HttpResponse::Ok().json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserSummary::from_record(&user, false),
    })
}

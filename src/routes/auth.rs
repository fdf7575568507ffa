// src/routes/auth.rs
use actix_web::{post, web, HttpResponse};
use sqlx::SqlitePool;

use crate::config::jwt::JwtSettings;
use crate::handlers::auth_handler::login_user;
use crate::handlers::password_reset_handler::{forgot_password, reset_password, verify_otp};
use crate::models::auth::{ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, VerifyOtpRequest};
use crate::services::PasswordResetService;

#[post("/api/login")]
async fn login(
    login_form: web::Json<LoginRequest>,
    pool: web::Data<SqlitePool>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    login_user(login_form, pool, jwt_settings).await
}

#[post("/api/forgot-password")]
async fn forgot_password_route(
    form: web::Json<ForgotPasswordRequest>,
    pool: web::Data<SqlitePool>,
    reset_service: web::Data<PasswordResetService>,
) -> HttpResponse {
    forgot_password(form, pool, reset_service).await
}

#[post("/api/verify-otp")]
async fn verify_otp_route(
    form: web::Json<VerifyOtpRequest>,
    reset_service: web::Data<PasswordResetService>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    verify_otp(form, reset_service, jwt_settings).await
}

#[post("/api/reset-password")]
async fn reset_password_route(
    form: web::Json<ResetPasswordRequest>,
    pool: web::Data<SqlitePool>,
    reset_service: web::Data<PasswordResetService>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    reset_password(form, pool, reset_service, jwt_settings).await
}

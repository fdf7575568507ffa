use actix_web::{http::StatusCode, web, HttpResponse};
use secrecy::ExposeSecret;
use serde_json::json;
use sqlx::SqlitePool;

use crate::config::jwt::JwtSettings;
use crate::db::helpers::error_response;
use crate::models::auth::{ForgotPasswordRequest, ResetPasswordRequest, VerifyOtpRequest};
use crate::services::password_reset::{PasswordResetError, PasswordResetService};

fn reset_error_response(err: PasswordResetError) -> HttpResponse {
    let status = match &err {
        PasswordResetError::EmailNotRegistered | PasswordResetError::UserNotFound => {
            StatusCode::NOT_FOUND
        }
        PasswordResetError::NoOtp
        | PasswordResetError::Expired
        | PasswordResetError::TooManyAttempts
        | PasswordResetError::InvalidOtp { .. }
        | PasswordResetError::AlreadyUsed
        | PasswordResetError::WeakPassword
        | PasswordResetError::InvalidResetToken
        | PasswordResetError::NotVerified => StatusCode::BAD_REQUEST,
        PasswordResetError::Mail(_) => {
            tracing::error!("{}", err);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send OTP email. Please try again later.",
            );
        }
        PasswordResetError::Store(_)
        | PasswordResetError::Database(_)
        | PasswordResetError::Token(_)
        | PasswordResetError::Hash(_) => {
            tracing::error!("Password reset failed: {}", err);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.",
            );
        }
    };
    error_response(status, &err.to_string())
}

#[tracing::instrument(name = "Forgot password", skip(form, pool, reset_service), fields(email = %form.email))]
pub async fn forgot_password(
    form: web::Json<ForgotPasswordRequest>,
    pool: web::Data<SqlitePool>,
    reset_service: web::Data<PasswordResetService>,
) -> HttpResponse {
    if form.email.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Email is required");
    }

    match reset_service.request_otp(&pool, &form.email).await {
        Ok(email) => HttpResponse::Ok().json(json!({
            "message": "OTP sent successfully to your email address",
            "email": email,
        })),
        Err(e) => reset_error_response(e),
    }
}

#[tracing::instrument(name = "Verify OTP", skip(form, reset_service, jwt_settings), fields(email = %form.email))]
pub async fn verify_otp(
    form: web::Json<VerifyOtpRequest>,
    reset_service: web::Data<PasswordResetService>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    if form.email.trim().is_empty() || form.otp.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Email and OTP are required");
    }

    match reset_service.verify_otp(&form.email, &form.otp, &jwt_settings).await {
        Ok(reset_token) => HttpResponse::Ok().json(json!({
            "message": "OTP verified successfully",
            "reset_token": reset_token,
        })),
        Err(e) => reset_error_response(e),
    }
}

#[tracing::instrument(name = "Reset password", skip(form, pool, reset_service, jwt_settings), fields(email = %form.email))]
pub async fn reset_password(
    form: web::Json<ResetPasswordRequest>,
    pool: web::Data<SqlitePool>,
    reset_service: web::Data<PasswordResetService>,
    jwt_settings: web::Data<JwtSettings>,
) -> HttpResponse {
    if form.email.trim().is_empty()
        || form.reset_token.trim().is_empty()
        || form.new_password.expose_secret().trim().is_empty()
    {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Email, reset token, and new password are required",
        );
    }

    match reset_service
        .reset_password(&pool, &form.email, form.reset_token.trim(), &form.new_password, &jwt_settings)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(json!({
            "message": "Password reset successfully. You can now login with your new password."
        })),
        Err(e) => reset_error_response(e),
    }
}

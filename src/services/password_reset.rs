//! Forgot / verify / reset flow on top of an [`OtpStore`] and a [`Mailer`].
//!
//! A record moves through `issued -> verified -> consumed`. Expired records
//! and records that ran out of attempts are dropped on the next check. Every
//! transition is a single atomic store operation.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use thiserror::Error as ThisError;

use crate::auth::jwt::{decode_token, generate_token};
use crate::config::jwt::JwtSettings;
use crate::db::users::{find_active_user_by_email, update_password};
use crate::middleware::auth::TokenScope;
use crate::services::mailer::{MailError, Mailer};
use crate::services::otp_store::{generate_otp, OtpCheck, OtpError, OtpRecord, OtpStore};
use crate::utils::password::hash_password;
use crate::utils::validation::{is_valid_password, normalize_email};

#[derive(Debug, ThisError)]
pub enum PasswordResetError {
    #[error("Email not registered. Please check your email address or create a new account.")]
    EmailNotRegistered,

    #[error("No OTP found. Please request a new one.")]
    NoOtp,

    #[error("OTP has expired. Please request a new one.")]
    Expired,

    #[error("Too many failed attempts. Please request a new OTP.")]
    TooManyAttempts,

    #[error("Invalid OTP. {remaining} attempts remaining.")]
    InvalidOtp { remaining: u32 },

    #[error("OTP already used. Please request a new one.")]
    AlreadyUsed,

    #[error("Password must be at least 6 characters long")]
    WeakPassword,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("OTP not verified. Please verify OTP first.")]
    NotVerified,

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to send OTP email: {0}")]
    Mail(#[from] MailError),

    #[error("OTP store error: {0}")]
    Store(#[from] OtpError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to issue token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub struct PasswordResetService {
    otp_store: Arc<dyn OtpStore>,
    mailer: Arc<dyn Mailer>,
}

impl PasswordResetService {
    pub fn new(otp_store: Arc<dyn OtpStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { otp_store, mailer }
    }

    /// Issue a fresh OTP (replacing any pending one) and mail it. Returns the normalised email.
    pub async fn request_otp(&self, pool: &SqlitePool, email: &str) -> Result<String, PasswordResetError> {
        let email = normalize_email(email);
        let user = find_active_user_by_email(pool, &email)
            .await?
            .ok_or(PasswordResetError::EmailNotRegistered)?;

        let record = OtpRecord::new(generate_otp(), user.id, Utc::now());
        self.otp_store.put(&email, &record).await?;

        if let Err(e) = self.mailer.send_otp(&email, &user.name, &record.otp).await {
            tracing::error!("Failed to send OTP email to {}: {}", email, e);
            self.otp_store.remove(&email).await?;
            return Err(e.into());
        }

        tracing::info!("OTP issued for user {}", user.id);
        Ok(email)
    }

    /// Check `otp` and, on success, hand out a password-reset token.
    pub async fn verify_otp(
        &self,
        email: &str,
        otp: &str,
        jwt_settings: &JwtSettings,
    ) -> Result<String, PasswordResetError> {
        let email = normalize_email(email);
        // Bound to the record by the same update that verifies it
        let reset_token = generate_token(&email, TokenScope::PasswordReset, jwt_settings)?;

        let check = self
            .otp_store
            .verify(&email, otp.trim(), &reset_token, Utc::now())
            .await?
            .ok_or(PasswordResetError::NoOtp)?;

        match check {
            OtpCheck::Verified => Ok(reset_token),
            OtpCheck::Mismatch { remaining } => Err(PasswordResetError::InvalidOtp { remaining }),
            OtpCheck::Expired => Err(PasswordResetError::Expired),
            OtpCheck::TooManyAttempts => Err(PasswordResetError::TooManyAttempts),
            OtpCheck::AlreadyUsed => Err(PasswordResetError::AlreadyUsed),
        }
    }

    /// Set a new password with a token from [`Self::verify_otp`]. The OTP record is consumed.
    pub async fn reset_password(
        &self,
        pool: &SqlitePool,
        email: &str,
        reset_token: &str,
        new_password: &SecretString,
        jwt_settings: &JwtSettings,
    ) -> Result<(), PasswordResetError> {
        let email = normalize_email(email);
        let new_password = new_password.expose_secret().trim();
        if !is_valid_password(new_password) {
            return Err(PasswordResetError::WeakPassword);
        }

        let claims = decode_token(reset_token, TokenScope::PasswordReset, jwt_settings)
            .map_err(|_| PasswordResetError::InvalidResetToken)?;
        if claims.email() != email {
            return Err(PasswordResetError::InvalidResetToken);
        }

        let password_hash = hash_password(new_password)?;
        if !self.otp_store.consume_verified(&email, reset_token).await? {
            return Err(PasswordResetError::NotVerified);
        }
        if !update_password(pool, &email, &password_hash).await? {
            return Err(PasswordResetError::UserNotFound);
        }

        tracing::info!("Password reset completed for {}", email);
        Ok(())
    }
}

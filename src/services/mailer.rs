use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error as ThisError;

use crate::config::mail::MailSettings;

pub const OTP_SUBJECT: &str = "Kare Healthcare - Password Reset OTP";

#[derive(Debug, ThisError)]
pub enum MailError {
    #[error("Mail delivery is not configured")]
    NotConfigured,

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, email: &str, name: &str, otp: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let mut builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        }
        .port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            sender: settings.sender.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, email: &str, name: &str, otp: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(email.parse()?)
            .subject(OTP_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(otp_email_body(name, otp))?;

        self.transport.send(message).await?;
        tracing::info!("OTP email sent to {}", email);
        Ok(())
    }
}

/// Used when `mail.enabled` is false. Every send fails.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send_otp(&self, email: &str, _name: &str, _otp: &str) -> Result<(), MailError> {
        tracing::warn!("Mail is disabled; cannot send OTP to {}", email);
        Err(MailError::NotConfigured)
    }
}

pub fn build_mailer(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    if !settings.enabled {
        tracing::info!("Mail delivery disabled");
        return Ok(Arc::new(DisabledMailer));
    }
    tracing::info!("SMTP mailer configured ({}:{})", settings.host, settings.port);
    Ok(Arc::new(SmtpMailer::new(settings)?))
}

pub fn otp_email_body(name: &str, otp: &str) -> String {
    format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
      <h2 style="color: #2563eb;">Kare Healthcare</h2>
      <p>Hello {name},</p>
      <p>You have requested to reset your password. Please use the following OTP to proceed:</p>
      <div style="background: #f3f4f6; padding: 20px; text-align: center; margin: 20px 0;">
        <span style="font-size: 32px; font-weight: bold; letter-spacing: 8px;">{otp}</span>
      </div>
      <p>This OTP will expire in 10 minutes.</p>
      <p>If you did not request a password reset, please ignore this email.</p>
      <p>Best regards,<br>Kare Healthcare Team</p>
    </div>
  </body>
</html>"#,
        name = name,
        otp = otp
    )
}

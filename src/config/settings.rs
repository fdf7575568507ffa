use std::env;
use config::{Config, File, ConfigError};
use dotenv::dotenv;
use secrecy::{ExposeSecret, SecretString};

use crate::config::jwt::JwtSettings;
use crate::config::llm::LlmSettings;
use crate::config::mail::MailSettings;
use crate::config::redis::RedisSettings;

#[derive(serde::Deserialize, Debug)]
pub struct Settings{
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtConfig,
    pub llm: LlmSettings,
    pub mail: MailSettings,
    #[serde(default)]
    pub redis: RedisSettings,
}

#[derive(serde::Deserialize, Debug)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub expiration_hours: i64,
}

#[derive(serde::Deserialize, Debug)]
pub struct DatabaseSettings{
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    8
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> SecretString {
        self.url.clone()
    }
}

#[derive(serde::Deserialize, Debug)]
pub struct ApplicationSettings{
    pub port: u16,
    pub host: String,
    pub log_level: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    dotenv().ok();

    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let env_filename = format!("{}.yml", environment.as_str());
    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yml")))
        .add_source(File::from(configuration_directory.join(env_filename)).required(false))
        .add_source(
            config::Environment::default()
                .prefix("APP")
                .prefix_separator("__")
                .separator("__")
        )
        .build()?;

    let mut settings = config.try_deserialize::<Settings>()?;
    apply_legacy_env_overrides(&mut settings);

    Ok(settings)
}

/// Variable names used by existing deployments (`.env` files) win over the yml files.
fn apply_legacy_env_overrides(settings: &mut Settings) {
    if let Ok(db_url) = env::var("DATABASE_URL") {
        settings.database.url = SecretString::new(db_url.into_boxed_str());
    }

    if let Ok(jwt_secret) = env::var("JWT_SECRET_KEY").or_else(|_| env::var("JWT_SECRET")) {
        settings.jwt.secret = SecretString::new(jwt_secret.into_boxed_str());
    }

    if let Ok(api_key) = env::var("AZURE_OPENAI_API_KEY") {
        settings.llm.azure.api_key = Some(SecretString::new(api_key.into_boxed_str()));
    }
    if let Ok(endpoint_url) = env::var("ENDPOINT_URL") {
        settings.llm.azure.endpoint = endpoint_url;
    }
    if let Ok(deployment) = env::var("DEPLOYMENT_NAME") {
        settings.llm.azure.deployment = deployment;
    }
    if let Ok(api_key) = env::var("GEMINI_API_KEY") {
        settings.llm.gemini.api_key = Some(SecretString::new(api_key.into_boxed_str()));
    }
    if let Ok(model) = env::var("GEMINI_MODEL") {
        settings.llm.gemini.model = model;
    }

    if let Ok(host) = env::var("MAIL_SERVER") {
        settings.mail.host = host;
    }
    if let Some(port) = env::var("MAIL_PORT").ok().and_then(|p| p.parse().ok()) {
        settings.mail.port = port;
    }
    if let Ok(use_tls) = env::var("MAIL_USE_TLS") {
        settings.mail.use_tls = use_tls.eq_ignore_ascii_case("true");
    }
    if let Ok(username) = env::var("MAIL_USERNAME") {
        settings.mail.username = Some(username);
        settings.mail.enabled = true;
    }
    if let Ok(password) = env::var("MAIL_PASSWORD") {
        settings.mail.password = Some(SecretString::new(password.into_boxed_str()));
    }
    if let Ok(sender) = env::var("MAIL_DEFAULT_SENDER") {
        settings.mail.sender = sender;
    }

    if let Ok(redis_url) = env::var("REDIS_URL") {
        if !redis_url.is_empty() {
            settings.redis.url = Some(SecretString::new(redis_url.into_boxed_str()));
        }
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. \
                Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_jwt_settings(settings: &Settings) -> JwtSettings {
    JwtSettings::new(
        settings.jwt.secret.expose_secret().to_string(),
        settings.jwt.expiration_hours,
    )
}

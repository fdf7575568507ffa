use serde::Deserialize;
use secrecy::SecretString;

#[derive(Deserialize, Debug, Clone)]
pub struct MailSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub sender: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
}

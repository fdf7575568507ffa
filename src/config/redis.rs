use serde::Deserialize;
use secrecy::SecretString;

/// Redis is optional. When no url is configured OTP state stays in process.
#[derive(Debug, Deserialize, Default)]
pub struct RedisSettings {
    #[serde(default)]
    pub url: Option<SecretString>,
}

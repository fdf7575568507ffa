use serde::Deserialize;
use secrecy::SecretString;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Azure,
    Gemini,
    None,
}

#[derive(Deserialize, Debug)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub azure: AzureOpenAiSettings,
    pub gemini: GeminiSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AzureOpenAiSettings {
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

impl AzureOpenAiSettings {
    /// Accepts either the resource endpoint or a full deployment url and
    /// returns the resource endpoint with a trailing slash.
    pub fn base_endpoint(&self) -> String {
        let endpoint = match self.endpoint.split_once("/openai/deployments/") {
            Some((base, _)) => base,
            None => self.endpoint.as_str(),
        };
        format!("{}/", endpoint.trim_end_matches('/'))
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

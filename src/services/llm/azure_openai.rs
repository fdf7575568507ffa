use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::ChatProvider;
use crate::config::llm::AzureOpenAiSettings;
use crate::models::llm::{ChatMessage, LlmError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
    user: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct AzureOpenAiProvider {
    client: Client,
    url: String,
    deployment: String,
    api_key: SecretString,
}

impl AzureOpenAiProvider {
    pub fn new(settings: &AzureOpenAiSettings, api_key: SecretString) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let url = format!(
            "{}openai/deployments/{}/chat/completions?api-version={}",
            settings.base_endpoint(),
            settings.deployment,
            settings.api_version
        );
        Ok(Self {
            client,
            url,
            deployment: settings.deployment.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatProvider for AzureOpenAiProvider {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    #[tracing::instrument(name = "Azure OpenAI completion", skip(self, messages), fields(messages = messages.len()))]
    async fn complete(&self, user_email: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = CompletionRequest {
            messages,
            max_tokens: 800,
            temperature: 0.7,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: false,
            user: format!("user_{}_{}", user_email, Utc::now().timestamp()),
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout } else { LlmError::NetworkError(e) })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, "Azure OpenAI API error");
            return Err(LlmError::Api { status: status.as_u16(), body: text });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("completion has no content".to_string()))
    }
}

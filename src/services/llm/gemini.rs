use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::ChatProvider;
use crate::config::llm::GeminiSettings;
use crate::models::llm::{ChatMessage, ChatRole, ContentPart, LlmError, MessageContent};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiProvider {
    pub fn new(settings: &GeminiSettings, api_key: SecretString) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }

    fn build_request(messages: &[ChatMessage]) -> GeminiRequest {
        let mut contents = Vec::new();
        let mut system_parts = Vec::new();

        for message in messages {
            let parts = convert_content(&message.content);
            match message.role {
                ChatRole::System => system_parts.extend(parts),
                ChatRole::User | ChatRole::Assistant => contents.push(GeminiContent {
                    role: Some(convert_role(message.role).to_string()),
                    parts,
                }),
            }
        }

        GeminiRequest {
            contents,
            system_instruction: (!system_parts.is_empty())
                .then(|| GeminiContent { role: None, parts: system_parts }),
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 1000,
                top_p: 0.8,
                top_k: 40,
            },
        }
    }
}

fn convert_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::Assistant => "model",
        _ => "user",
    }
}

fn convert_content(content: &MessageContent) -> Vec<GeminiPart> {
    match content {
        MessageContent::Text(text) => vec![GeminiPart::Text { text: text.clone() }],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => GeminiPart::Text { text: text.clone() },
                ContentPart::ImageUrl { image_url } => match parse_data_url(&image_url.url) {
                    Some(inline_data) => GeminiPart::InlineData { inline_data },
                    None => GeminiPart::Text { text: format!("[Image: {}]", image_url.url) },
                },
            })
            .collect(),
    }
}

/// `data:<mime>;base64,<payload>` into an inline blob.
fn parse_data_url(url: &str) -> Option<InlineData> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let mime_type = meta.strip_suffix(";base64")?;
    Some(InlineData {
        mime_type: if mime_type.is_empty() { "image/jpeg".to_string() } else { mime_type.to_string() },
        data: data.to_string(),
    })
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(name = "Gemini completion", skip(self, messages), fields(messages = messages.len()))]
    async fn complete(&self, _user_email: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::build_request(messages);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout } else { LlmError::NetworkError(e) })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, "Gemini API error");
            return Err(LlmError::Api { status: status.as_u16(), body: text });
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)?;
        if let Some(error) = parsed.error {
            return Err(LlmError::InvalidResponse(error.message));
        }

        let reply = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| match part {
                        GeminiPart::Text { text } => Some(text),
                        GeminiPart::InlineData { .. } => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(LlmError::InvalidResponse("Gemini returned no text".to_string()));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::llm::ImageUrl;

    #[test]
    fn system_prompt_moves_to_system_instruction() {
        let messages = vec![
            ChatMessage::system("be kind"),
            ChatMessage::user(MessageContent::Text("hi".into())),
            ChatMessage::assistant("hello"),
        ];
        let request = GeminiProvider::build_request(&messages);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be kind");
        assert_eq!(value["contents"].as_array().unwrap().len(), 2);
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 1000);
        assert_eq!(value["generationConfig"]["topK"], 40);
    }

    #[test]
    fn data_url_images_become_inline_data() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "look".into() },
            ContentPart::ImageUrl { image_url: ImageUrl { url: "data:image/png;base64,iVBOR".into() } },
        ]);
        let parts = convert_content(&content);
        assert_eq!(
            parts[1],
            GeminiPart::InlineData {
                inline_data: InlineData { mime_type: "image/png".into(), data: "iVBOR".into() }
            }
        );
        assert!(parse_data_url("https://example.com/a.png").is_none());
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Roles stored in the `conversations` table. The system prompt is never persisted.
    pub fn from_stored(role: &str) -> Option<Self> {
        match role {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Plain text, or the multimodal parts list understood by chat-completion APIs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text value stored in the database: plain text as is, parts as JSON.
    pub fn to_stored(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => {
                serde_json::to_string(parts).unwrap_or_default()
            }
        }
    }

    /// Inverse of [`MessageContent::to_stored`]. Anything that does not parse stays text.
    pub fn from_stored(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('[') {
            if let Ok(parts) = serde_json::from_str::<Vec<ContentPart>>(raw) {
                return MessageContent::Parts(parts);
            }
        } else if trimmed.starts_with('{') {
            if let Ok(part) = serde_json::from_str::<ContentPart>(raw) {
                return MessageContent::Parts(vec![part]);
            }
        }
        MessageContent::Text(raw.to_string())
    }

    /// Concatenated text parts, images left out.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: MessageContent::Text(text.into()) }
    }

    pub fn user(content: MessageContent) -> Self {
        Self { role: ChatRole::User, content }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: MessageContent::Text(text.into()) }
    }
}

#[derive(Debug, ThisError)]
pub enum LlmError {
    #[error("LLM provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

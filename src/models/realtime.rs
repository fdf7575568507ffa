use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::conversation::MessageType;
use crate::models::llm::{ContentPart, ImageUrl, MessageContent};

/// Wire envelope for every frame on `/ws`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RealtimeEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl RealtimeEvent {
    pub fn new(event: &str, data: Value) -> Self {
        Self { event: event.to_string(), data }
    }

    pub fn connection_success(name: &str) -> Self {
        Self::new("connection_success", json!({ "message": format!("Welcome back, {}!", name) }))
    }

    pub fn bot_response(reply: &str) -> Self {
        Self::new("bot_response", Value::String(reply.to_string()))
    }

    pub fn conversation_cleared() -> Self {
        Self::new("conversation_cleared", json!({ "message": "Conversation history cleared" }))
    }

    pub fn error(message: &str) -> Self {
        Self::new("error", json!({ "message": message }))
    }

    pub fn pong() -> Self {
        Self::new("pong", json!({ "timestamp": chrono::Utc::now().to_rfc3339() }))
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    UserInput(Value),
    ClearConversation,
    GetConversationHistory,
    Ping,
}

impl ClientEvent {
    pub fn parse(frame: &str) -> Result<Self, String> {
        let envelope: RealtimeEvent = serde_json::from_str(frame)
            .map_err(|_| "Invalid event frame".to_string())?;
        match envelope.event.as_str() {
            "user_input" => Ok(ClientEvent::UserInput(envelope.data)),
            "send_message" => Ok(ClientEvent::UserInput(unwrap_send_message(envelope.data))),
            "clear_conversation" => Ok(ClientEvent::ClearConversation),
            "get_conversation_history" => Ok(ClientEvent::GetConversationHistory),
            "ping" => Ok(ClientEvent::Ping),
            other => Err(format!("Unknown event '{}'", other)),
        }
    }
}

/// `send_message` carries `{message: ...}`; everything else is taken as `user_input` data.
fn unwrap_send_message(data: Value) -> Value {
    match data {
        Value::Object(mut map) if map.contains_key("message") && !map.contains_key("text") => {
            map.remove("message").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// A user turn, ready to store and to send to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTurn {
    pub content: MessageContent,
    pub display_text: String,
    pub message_type: MessageType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    InvalidFormat,
    Empty,
}

impl InputError {
    pub fn message(&self) -> &'static str {
        match self {
            InputError::InvalidFormat => "Invalid message format",
            InputError::Empty => "Message cannot be empty",
        }
    }
}

/// Accepts a bare string or `{text?, attachment?{name, data}}`.
pub fn parse_user_input(data: &Value) -> Result<UserTurn, InputError> {
    let turn = match data {
        Value::String(text) => {
            let text = text.trim().to_string();
            UserTurn {
                content: MessageContent::Text(text.clone()),
                display_text: text,
                message_type: MessageType::Text,
            }
        }
        Value::Object(map) => {
            let text = map
                .get("text")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            match map.get("attachment") {
                Some(Value::Object(attachment)) => {
                    let name = attachment.get("name").and_then(Value::as_str).unwrap_or("image");
                    let url = attachment.get("data").and_then(Value::as_str).unwrap_or_default();
                    let mut parts = Vec::with_capacity(2);
                    if !text.is_empty() {
                        parts.push(ContentPart::Text { text: text.clone() });
                    }
                    parts.push(ContentPart::ImageUrl { image_url: ImageUrl { url: url.to_string() } });
                    let display_text = if text.is_empty() {
                        format!("[Image: {}]", name)
                    } else {
                        format!("{} [Image: {}]", text, name)
                    };
                    UserTurn {
                        content: MessageContent::Parts(parts),
                        display_text,
                        message_type: MessageType::Image,
                    }
                }
                _ => UserTurn {
                    content: MessageContent::Text(text.clone()),
                    display_text: text,
                    message_type: MessageType::Text,
                },
            }
        }
        _ => return Err(InputError::InvalidFormat),
    };

    if turn.display_text.trim().is_empty() {
        return Err(InputError::Empty);
    }
    Ok(turn)
}

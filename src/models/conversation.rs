use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::llm::{ChatMessage, ChatRole, MessageContent};

pub const DEFAULT_CONVERSATION_ID: &str = "default";

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ConversationRecord {
    pub id: i64,
    pub user_id: i64,
    pub conversation_id: String,
    pub message_role: String,
    pub message_content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn content(&self) -> MessageContent {
        MessageContent::from_stored(&self.message_content)
    }

    /// `None` for rows whose role cannot be replayed to a model.
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        ChatRole::from_stored(&self.message_role).map(|role| ChatMessage {
            role,
            content: self.content(),
        })
    }
}

/// One entry of the `conversation_history` real-time event.
#[derive(Serialize, Debug)]
pub struct ConversationEntry {
    pub id: i64,
    pub user_id: i64,
    pub conversation_id: String,
    pub role: String,
    pub content: MessageContent,
    #[serde(rename = "type")]
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<ConversationRecord> for ConversationEntry {
    fn from(record: ConversationRecord) -> Self {
        let content = record.content();
        Self {
            id: record.id,
            user_id: record.user_id,
            conversation_id: record.conversation_id,
            role: record.message_role,
            content,
            message_type: record.message_type,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Image,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
        }
    }
}

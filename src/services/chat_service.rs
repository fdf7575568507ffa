use std::sync::Arc;

use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error as ThisError;

use crate::db::conversations::{clear_history, insert_message, recent_history};
use crate::models::conversation::{ConversationEntry, MessageType, DEFAULT_CONVERSATION_ID};
use crate::models::llm::{ChatMessage, ChatRole};
use crate::models::realtime::{parse_user_input, InputError, RealtimeEvent};
use crate::services::conversation_cache::{choose_context, ConversationCache};
use crate::services::llm::{ChatProvider, PROVIDER_ERROR_REPLY, UNAVAILABLE_REPLY};

pub const HISTORY_LIMIT: i64 = 50;
pub const GENERIC_CHAT_ERROR: &str =
    "Sorry, I'm having trouble processing your request. Please try again.";

#[derive(Debug, ThisError)]
pub enum ChatError {
    #[error("{}", .0.message())]
    Input(InputError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<InputError> for ChatError {
    fn from(err: InputError) -> Self {
        ChatError::Input(err)
    }
}

/// The authenticated user behind a real-time session.
#[derive(Debug, Clone)]
pub struct ChatUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

pub struct ChatService {
    pool: SqlitePool,
    provider: Option<Arc<dyn ChatProvider>>,
    cache: Arc<ConversationCache>,
}

impl ChatService {
    pub fn new(
        pool: SqlitePool,
        provider: Option<Arc<dyn ChatProvider>>,
        cache: Arc<ConversationCache>,
    ) -> Self {
        Self { pool, provider, cache }
    }

    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    pub fn provider(&self) -> Option<&Arc<dyn ChatProvider>> {
        self.provider.as_ref()
    }

    /// Run one chat turn and return the event to send back to the client.
    ///
    /// Provider failures never surface as errors; they become a canned reply.
    #[tracing::instrument(name = "Chat turn", skip(self, data), fields(user = %user.email))]
    pub async fn handle_user_input(&self, user: &ChatUser, data: &Value) -> Result<String, ChatError> {
        let turn = parse_user_input(data)?;
        self.cache.ensure(&user.email);

        if let Err(e) = insert_message(
            &self.pool,
            user.id,
            DEFAULT_CONVERSATION_ID,
            ChatRole::User.as_str(),
            &turn.content.to_stored(),
            turn.message_type.as_str(),
        )
        .await
        {
            tracing::error!("Failed to store user message: {}", e);
        }

        let from_db = match self.context_from_db(user.id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!("Failed to load conversation history: {}", e);
                vec![self.cache.system_message()]
            }
        };
        let from_memory = self
            .cache
            .push(&user.email, ChatMessage::user(turn.content.clone()));
        tracing::debug!(
            "Context candidates: {} from database, {} in memory",
            from_db.len(),
            from_memory.len()
        );
        let context = choose_context(from_db, from_memory);

        let reply = self.ask_provider(&user.email, &context).await;

        if let Err(e) = insert_message(
            &self.pool,
            user.id,
            DEFAULT_CONVERSATION_ID,
            ChatRole::Assistant.as_str(),
            &reply,
            MessageType::Text.as_str(),
        )
        .await
        {
            tracing::error!("Failed to store assistant reply: {}", e);
        }
        self.cache.push(&user.email, ChatMessage::assistant(reply.clone()));

        Ok(reply)
    }

    /// Drop the default conversation from the database and from memory.
    pub async fn clear(&self, user: &ChatUser) -> Result<u64, ChatError> {
        let deleted = clear_history(&self.pool, user.id, DEFAULT_CONVERSATION_ID).await?;
        self.cache.reset(&user.email);
        tracing::info!("Cleared {} conversation messages for {}", deleted, user.email);
        Ok(deleted)
    }

    pub async fn history(&self, user: &ChatUser) -> Result<Vec<ConversationEntry>, ChatError> {
        let records = recent_history(&self.pool, user.id, DEFAULT_CONVERSATION_ID, HISTORY_LIMIT).await?;
        Ok(records.into_iter().map(ConversationEntry::from).collect())
    }

    /// `[system] + last HISTORY_LIMIT messages`, chronological.
    async fn context_from_db(&self, user_id: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let records = recent_history(&self.pool, user_id, DEFAULT_CONVERSATION_ID, HISTORY_LIMIT).await?;
        let mut messages = Vec::with_capacity(records.len() + 1);
        messages.push(self.cache.system_message());
        messages.extend(records.iter().filter_map(|record| record.to_chat_message()));
        Ok(messages)
    }

    async fn ask_provider(&self, user_email: &str, context: &[ChatMessage]) -> String {
        let Some(provider) = &self.provider else {
            tracing::warn!("No AI provider configured, answering with fallback reply");
            return UNAVAILABLE_REPLY.to_string();
        };

        match provider.complete(user_email, context).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("{} completion failed: {}", provider.name(), e);
                PROVIDER_ERROR_REPLY.to_string()
            }
        }
    }
}

/// Map a chat failure to the event the client sees.
pub fn error_event(err: &ChatError) -> RealtimeEvent {
    match err {
        ChatError::Input(input) => RealtimeEvent::error(input.message()),
        ChatError::Database(_) => RealtimeEvent::error(GENERIC_CHAT_ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::models::llm::{LlmError, MessageContent};

    struct RecordingProvider {
        reply: Result<String, ()>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, _user_email: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.reply
                .clone()
                .map_err(|_| LlmError::InvalidResponse("boom".into()))
        }
    }

    async fn pool_with_user() -> (SqlitePool, ChatUser) {
        let pool = crate::db::connect("sqlite::memory:", 1).await.unwrap();
        crate::db::migrate(&pool).await.unwrap();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, name, created_at, updated_at) VALUES ('c@example.com', 'x', 'Cara', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        (
            pool,
            ChatUser { id, email: "c@example.com".into(), name: "Cara".into() },
        )
    }

    #[tokio::test]
    async fn turn_without_provider_stores_both_messages() {
        let (pool, user) = pool_with_user().await;
        let service = ChatService::new(pool.clone(), None, Arc::new(ConversationCache::new("sys")));

        let reply = service.handle_user_input(&user, &json!("I have a headache")).await.unwrap();
        assert_eq!(reply, UNAVAILABLE_REPLY);

        let history = service.history(&user).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[tokio::test]
    async fn provider_sees_system_prompt_and_history() {
        let (pool, user) = pool_with_user().await;
        let provider = Arc::new(RecordingProvider { reply: Ok("How old are you?".into()), seen: Mutex::new(vec![]) });
        let service = ChatService::new(
            pool,
            Some(provider.clone() as Arc<dyn ChatProvider>),
            Arc::new(ConversationCache::new("sys")),
        );

        service.handle_user_input(&user, &json!("fever")).await.unwrap();
        service.handle_user_input(&user, &json!("I'm 30")).await.unwrap();

        let seen = provider.seen.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[0].role, ChatRole::System);
        assert_eq!(second[3].content, MessageContent::Text("I'm 30".into()));
    }

    #[tokio::test]
    async fn provider_error_becomes_apology() {
        let (pool, user) = pool_with_user().await;
        let provider = Arc::new(RecordingProvider { reply: Err(()), seen: Mutex::new(vec![]) });
        let service = ChatService::new(pool, Some(provider), Arc::new(ConversationCache::new("sys")));

        let reply = service.handle_user_input(&user, &json!("hello")).await.unwrap();
        assert_eq!(reply, PROVIDER_ERROR_REPLY);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_and_not_stored() {
        let (pool, user) = pool_with_user().await;
        let service = ChatService::new(pool, None, Arc::new(ConversationCache::new("sys")));

        let err = service.handle_user_input(&user, &json!("   ")).await.unwrap_err();
        assert_eq!(err.to_string(), "Message cannot be empty");
        assert!(service.history(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_empties_database_and_memory() {
        let (pool, user) = pool_with_user().await;
        let service = ChatService::new(pool, None, Arc::new(ConversationCache::new("sys")));
        service.handle_user_input(&user, &json!("hi")).await.unwrap();

        let deleted = service.clear(&user).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(service.history(&user).await.unwrap().is_empty());
        assert_eq!(service.cache().len(&user.email), 1);
    }
}

use dashmap::DashMap;

use crate::models::llm::ChatMessage;

/// Process-local mirror of each user's default conversation, keyed by email.
///
/// Every list starts with the system prompt. The mirror is never merged with
/// the database; callers pick the longer of the two with [`choose_context`].
pub struct ConversationCache {
    histories: DashMap<String, Vec<ChatMessage>>,
    system_prompt: String,
}

impl ConversationCache {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            histories: DashMap::new(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_message(&self) -> ChatMessage {
        ChatMessage::system(self.system_prompt.clone())
    }

    /// Seed the user's list if this is the first time we see them.
    pub fn ensure(&self, email: &str) {
        self.histories
            .entry(email.to_string())
            .or_insert_with(|| vec![self.system_message()]);
    }

    /// Append and return a copy of the list including the new message.
    pub fn push(&self, email: &str, message: ChatMessage) -> Vec<ChatMessage> {
        let mut entry = self
            .histories
            .entry(email.to_string())
            .or_insert_with(|| vec![self.system_message()]);
        entry.push(message);
        entry.clone()
    }

    #[cfg(test)]
    pub fn snapshot(&self, email: &str) -> Vec<ChatMessage> {
        self.histories
            .get(email)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| vec![self.system_message()])
    }

    pub fn reset(&self, email: &str) {
        self.histories
            .insert(email.to_string(), vec![self.system_message()]);
    }

    pub fn len(&self, email: &str) -> usize {
        self.histories.get(email).map(|entry| entry.len()).unwrap_or(1)
    }
}

/// The prompt context is whichever history is longer; ties go to the database.
pub fn choose_context(from_db: Vec<ChatMessage>, from_memory: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if from_db.len() < from_memory.len() {
        from_memory
    } else {
        from_db
    }
}

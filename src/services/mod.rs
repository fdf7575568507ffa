pub mod chat_service;
pub mod conversation_cache;
pub mod llm;
pub mod mailer;
pub mod otp_store;
pub mod password_reset;
pub mod session_registry;

pub use chat_service::ChatService;
pub use conversation_cache::ConversationCache;
pub use password_reset::PasswordResetService;
pub use session_registry::SessionRegistry;

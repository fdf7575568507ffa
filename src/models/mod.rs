pub mod auth;
pub mod conversation;
pub mod device;
pub mod llm;
pub mod medical_history;
pub mod realtime;
pub mod user;
pub mod vital_signs;

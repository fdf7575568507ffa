pub mod settings;
pub mod jwt;
pub mod llm;
pub mod mail;
pub mod redis;

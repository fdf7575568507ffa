//! Chat-completion providers behind one async trait.
//!
//! The provider is chosen once at startup from `llm.provider`. A provider
//! with missing credentials is treated as absent: the chat keeps working and
//! answers with a fixed apology instead.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::config::llm::{LlmProviderKind, LlmSettings};
use crate::models::llm::{ChatMessage, LlmError};

pub mod azure_openai;
pub mod gemini;

pub use azure_openai::AzureOpenAiProvider;
pub use gemini::GeminiProvider;

pub const SYSTEM_PROMPT: &str = "You are a polite and empathetic medical assistant who replies like a human doctor. Use polite expressions and some natural reactions (like 'Oh no!', 'That sounds uncomfortable 😟'). For non-medical questions, respond normally.\n\nWhen the user mentions a symptom:\n\nFirst, ask for their age\n\nThen ask for any other symptoms\n\nThen ask for vital signs, but only the ones relevant to the symptoms:\n\nFor fever → ask for temperature\n\nFor chest pain / shortness of breath / dizziness → ask for heart rate, SpO₂, ECG (if available)\n\nFor headache / fainting / weakness → ask for blood pressure (if known)\n\nFor palpitations / anxiety → ask for heart rate and ECG\n\nFor low energy / fatigue → ask for SpO₂, pulse rate\n\nNever respond with the full answer at once — first, ask polite, intelligent follow-up questions.\nAfter collecting enough information, suggest the most likely condition (in bold) and provide safe remedies or advice based on age group.\n\nUse bold formatting for disease names and important points in your answers. Avoid sounding robotic or overly brief or wordy.";

pub const UNAVAILABLE_REPLY: &str = "I apologize, but the AI chat functionality is currently unavailable. The healthcare application is running, but the AI service needs to be configured. Please contact your administrator to set up Azure OpenAI credentials.";

pub const PROVIDER_ERROR_REPLY: &str = "I'm sorry, I'm experiencing technical difficulties right now. Please try again in a moment, or contact support if the problem persists.";

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    /// One non-streaming completion. `user_email` identifies the caller to the provider.
    async fn complete(&self, user_email: &str, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

pub fn build_provider(settings: &LlmSettings) -> Result<Option<Arc<dyn ChatProvider>>, LlmError> {
    match settings.provider {
        LlmProviderKind::Azure => match &settings.azure.api_key {
            Some(key) if !key.expose_secret().is_empty() => {
                let provider = AzureOpenAiProvider::new(&settings.azure, key.clone())?;
                tracing::info!(
                    "Azure OpenAI provider configured (deployment: {})",
                    settings.azure.deployment
                );
                Ok(Some(Arc::new(provider)))
            }
            _ => {
                tracing::warn!("No Azure OpenAI API key configured; AI chat will answer with a fallback message");
                Ok(None)
            }
        },
        LlmProviderKind::Gemini => match &settings.gemini.api_key {
            Some(key) if !key.expose_secret().is_empty() => {
                let provider = GeminiProvider::new(&settings.gemini, key.clone())?;
                tracing::info!("Gemini provider configured (model: {})", settings.gemini.model);
                Ok(Some(Arc::new(provider)))
            }
            _ => {
                tracing::warn!("No Gemini API key configured; AI chat will answer with a fallback message");
                Ok(None)
            }
        },
        LlmProviderKind::None => {
            tracing::info!("AI provider disabled by configuration");
            Ok(None)
        }
    }
}

/// First 100 characters of the system prompt, as shown by `/health`.
pub fn system_prompt_preview() -> String {
    let preview: String = SYSTEM_PROMPT.chars().take(100).collect();
    format!("{}...", preview)
}

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::services::llm::system_prompt_preview;
use crate::services::ChatService;

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Kare healthcare server is running!")
}

pub async fn backend_health_check(chat: web::Data<ChatService>) -> HttpResponse {
    let (provider, model) = match chat.provider() {
        Some(provider) => (provider.name(), Some(provider.model().to_string())),
        None => ("none", None),
    };

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "provider": provider,
        "model": model,
        "system_message": system_prompt_preview(),
    }))
}

use actix_web::{get, web, HttpResponse};

use crate::handlers::backend_health_handler::{backend_health_check, index};
use crate::services::ChatService;

#[get("/")]
async fn root() -> HttpResponse {
    index().await
}

#[get("/health")]
async fn backend_health(chat: web::Data<ChatService>) -> HttpResponse {
    backend_health_check(chat).await
}

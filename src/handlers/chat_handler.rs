use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::helpers::error_response;
use crate::handlers::current_user;
use crate::middleware::auth::Claims;
use crate::ok_or_return;
use crate::services::chat_service::ChatUser;
use crate::services::ChatService;

/// Forget the caller's default conversation, in the database and in memory.
#[tracing::instrument(name = "Clear conversation cache", skip(pool, claims, chat), fields(email = %claims.email()))]
pub async fn clear_cache(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    chat: web::Data<ChatService>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let chat_user = ChatUser { id: user.id, email: user.email, name: user.name };

    match chat.clear(&chat_user).await {
        Ok(deleted) => HttpResponse::Ok().json(json!({
            "status": "success",
            "message": format!("Cleared {} conversation messages", deleted),
        })),
        Err(e) => {
            tracing::error!("Failed to clear conversation: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to clear conversation history")
        }
    }
}

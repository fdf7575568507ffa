use actix_web::{delete, get, put, web, HttpResponse};
use sqlx::SqlitePool;

use crate::handlers::chat_handler::clear_cache;
use crate::handlers::profile::profile::{delete_user_profile, get_user_profile, update_user_profile};
use crate::handlers::profile::stats::get_profile_stats;
use crate::middleware::auth::Claims;
use crate::models::user::UpdateProfileRequest;
use crate::services::ChatService;

#[get("/profile")]
async fn get_profile(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_user_profile(pool, claims).await
}

#[put("/profile")]
async fn update_profile(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    data: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    update_user_profile(pool, claims, data).await
}

#[delete("/profile")]
async fn delete_profile(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    delete_user_profile(pool, claims).await
}

#[get("/profile/stats")]
async fn profile_stats(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    get_profile_stats(pool, claims).await
}

#[get("/clear-cache")]
async fn clear_conversation_cache(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
    chat: web::Data<ChatService>,
) -> HttpResponse {
    clear_cache(pool, claims, chat).await
}

use actix_web::{get, web, HttpResponse};
use sqlx::SqlitePool;

use crate::handlers::stats_handler::get_system_stats;

#[get("/stats")]
async fn system_stats(pool: web::Data<SqlitePool>) -> HttpResponse {
    get_system_stats(pool).await
}

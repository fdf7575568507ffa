use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::conversations::count_conversations;
use crate::db::helpers::db_result;
use crate::db::users::{count_active_users, count_users_registered_since};
use crate::ok_or_return;

#[tracing::instrument(name = "Get system stats", skip(pool))]
pub async fn get_system_stats(pool: web::Data<SqlitePool>) -> HttpResponse {
    let failure = "Failed to get statistics";
    let start_of_day = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or_else(Utc::now);

    let total_users = ok_or_return!(db_result(count_active_users(&pool).await, failure));
    let users_registered_today = ok_or_return!(db_result(
        count_users_registered_since(&pool, start_of_day).await,
        failure
    ));
    let total_conversations = ok_or_return!(db_result(count_conversations(&pool).await, failure));

    HttpResponse::Ok().json(json!({
        "total_users": total_users,
        "users_registered_today": users_registered_today,
        "total_conversations": total_conversations,
    }))
}

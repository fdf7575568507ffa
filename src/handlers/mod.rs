pub mod auth_handler;
pub mod backend_health_handler;
pub mod chat_handler;
pub mod device;
pub mod health_data;
pub mod password_reset_handler;
pub mod profile;
pub mod registration_handler;
pub mod stats_handler;

use actix_web::web;
use sqlx::SqlitePool;

use crate::db::helpers::{require_record, DbResult};
use crate::db::users::find_active_user_by_email;
use crate::middleware::auth::Claims;
use crate::models::user::UserRecord;

/// The active account behind a session token, or a 404 response.
pub async fn current_user(pool: &SqlitePool, claims: &web::ReqData<Claims>) -> DbResult<UserRecord> {
    require_record(
        find_active_user_by_email(pool, claims.email()).await,
        "User not found",
    )
}

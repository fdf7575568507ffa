use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::conversations::{count_messages, latest_messages};
use crate::db::helpers::db_result;
use crate::db::medical_history::count_conditions;
use crate::db::vital_signs::{count_vital_signs, latest_vital_signs};
use crate::handlers::current_user;
use crate::middleware::auth::Claims;
use crate::ok_or_return;

const MAX_RECENT_ACTIVITIES: usize = 5;

#[derive(Serialize, Debug)]
pub struct RecentActivity {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub time: DateTime<Utc>,
    pub icon: &'static str,
}

#[tracing::instrument(
    name = "Get profile stats",
    skip(pool, claims),
    fields(email = %claims.email())
)]
pub async fn get_profile_stats(
    pool: web::Data<SqlitePool>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    let user = ok_or_return!(current_user(&pool, &claims).await);
    let failure = "Failed to get profile statistics";

    let total_checkups = ok_or_return!(db_result(count_messages(&pool, user.id).await, failure));
    let vital_records = ok_or_return!(db_result(count_vital_signs(&pool, user.id).await, failure));
    let medical_conditions = ok_or_return!(db_result(count_conditions(&pool, user.id).await, failure));
    let latest_vitals = ok_or_return!(db_result(latest_vital_signs(&pool, user.id).await, failure));
    let recent_messages = ok_or_return!(db_result(latest_messages(&pool, user.id, 2).await, failure));

    let mut recent_activities: Vec<RecentActivity> = latest_vitals
        .into_iter()
        .map(|vitals| RecentActivity {
            kind: "vital_signs",
            title: "Vital signs recorded",
            time: vitals.recorded_at,
            icon: "chart",
        })
        .chain(recent_messages.into_iter().map(|message| RecentActivity {
            kind: "conversation",
            title: "Chat session",
            time: message.created_at,
            icon: "chat",
        }))
        .collect();
    recent_activities.sort_by(|a, b| b.time.cmp(&a.time));
    recent_activities.truncate(MAX_RECENT_ACTIVITIES);

    HttpResponse::Ok().json(json!({
        "stats": {
            "total_checkups": total_checkups,
            "vital_records": vital_records,
            "medical_conditions": medical_conditions,
            "recent_activities": recent_activities,
        }
    }))
}

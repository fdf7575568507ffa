use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::models::medical_history::{ConditionStatus, MedicalCondition};

pub async fn insert_condition(
    pool: &SqlitePool,
    user_id: i64,
    condition_name: &str,
    diagnosis_date: Option<NaiveDate>,
    status: ConditionStatus,
    notes: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO medical_history (user_id, condition_name, diagnosis_date, status, notes, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(condition_name)
    .bind(diagnosis_date)
    .bind(status.as_str())
    .bind(notes)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// Most recent diagnosis first; undated conditions last.
pub async fn list_conditions(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<MedicalCondition>, sqlx::Error> {
    sqlx::query_as::<_, MedicalCondition>(
        r#"
        SELECT id, user_id, condition_name, diagnosis_date, status, notes, created_at
        FROM medical_history
        WHERE user_id = $1
        ORDER BY diagnosis_date IS NULL, diagnosis_date DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn count_conditions(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM medical_history WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

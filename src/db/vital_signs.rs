use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::vital_signs::{NewVitalSigns, VitalSigns};

const VITAL_COLUMNS: &str = r#"
    id, user_id, temperature, heart_rate, blood_pressure_systolic, blood_pressure_diastolic,
    oxygen_saturation, weight, height, recorded_at, notes
"#;

pub async fn insert_vital_signs(
    pool: &SqlitePool,
    user_id: i64,
    vitals: &NewVitalSigns,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO vital_signs (
            user_id, temperature, heart_rate, blood_pressure_systolic, blood_pressure_diastolic,
            oxygen_saturation, weight, height, notes, recorded_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(vitals.temperature)
    .bind(vitals.heart_rate)
    .bind(vitals.blood_pressure_systolic)
    .bind(vitals.blood_pressure_diastolic)
    .bind(vitals.oxygen_saturation)
    .bind(vitals.weight)
    .bind(vitals.height)
    .bind(&vitals.notes)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// Newest first
pub async fn list_vital_signs(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<VitalSigns>, sqlx::Error> {
    sqlx::query_as::<_, VitalSigns>(&format!(
        "SELECT {} FROM vital_signs WHERE user_id = $1 ORDER BY recorded_at DESC, id DESC LIMIT $2",
        VITAL_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn latest_vital_signs(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<VitalSigns>, sqlx::Error> {
    sqlx::query_as::<_, VitalSigns>(&format!(
        "SELECT {} FROM vital_signs WHERE user_id = $1 ORDER BY recorded_at DESC, id DESC LIMIT 1",
        VITAL_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn count_vital_signs(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM vital_signs WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

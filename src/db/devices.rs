use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error as ThisError;

use crate::models::device::{DeviceDataRecord, SensorReadings, WearableDevice};

const DEVICE_COLUMNS: &str =
    "id, user_id, device_id, device_name, device_type, is_active, last_sync, created_at, updated_at";

const READING_COLUMNS: &str = r#"
    id, device_id, user_id, timestamp, temperature_c, temperature_f, heart_rate_bpm, spo2_percent,
    ecg_data, blood_pressure_systolic, blood_pressure_diastolic, steps, calories_burned,
    data_quality, battery_level, signal_strength, created_at
"#;

#[derive(Debug, ThisError)]
pub enum DeviceError {
    #[error("Device is already linked to another user")]
    LinkedElsewhere,

    #[error("Device is not linked to this user")]
    NotLinkedToUser,

    #[error("No device linked to this user")]
    NoDeviceLinked,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Link `device_id` to `user_id`, keeping "one device per user, one user per device".
///
/// Any other active device of the user is deactivated in the same transaction.
pub async fn link_device(
    pool: &SqlitePool,
    user_id: i64,
    device_id: &str,
    device_name: Option<&str>,
    device_type: &str,
) -> Result<WearableDevice, DeviceError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let owner: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT u.id FROM users u
        WHERE u.is_active = 1 AND u.id != $2 AND (
            u.linked_device_id = $1
            OR u.id IN (SELECT user_id FROM wearable_devices WHERE device_id = $1 AND is_active = 1)
        )
        "#,
    )
    .bind(device_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if owner.is_some() {
        return Err(DeviceError::LinkedElsewhere);
    }

    sqlx::query(
        r#"
        UPDATE wearable_devices SET is_active = 0, updated_at = $3
        WHERE user_id = $1 AND device_id != $2 AND is_active = 1
        "#,
    )
    .bind(user_id)
    .bind(device_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    // Release the id from any inactive account still pointing at it
    sqlx::query(
        "UPDATE users SET linked_device_id = NULL, device_linked_at = NULL WHERE linked_device_id = $1 AND id != $2",
    )
    .bind(device_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let device = sqlx::query_as::<_, WearableDevice>(&format!(
        r#"
        INSERT INTO wearable_devices (user_id, device_id, device_name, device_type, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 1, $5, $5)
        ON CONFLICT(device_id) DO UPDATE SET
            user_id = excluded.user_id,
            device_name = COALESCE(excluded.device_name, wearable_devices.device_name),
            device_type = excluded.device_type,
            is_active = 1,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        DEVICE_COLUMNS
    ))
    .bind(user_id)
    .bind(device_id)
    .bind(device_name)
    .bind(device_type)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE users SET linked_device_id = $2, device_linked_at = $3, updated_at = $3 WHERE id = $1",
    )
    .bind(user_id)
    .bind(device_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(device)
}

/// Unlink a specific device of the user.
pub async fn unlink_device(
    pool: &SqlitePool,
    user_id: i64,
    device_id: &str,
) -> Result<(), DeviceError> {
    let mut tx = pool.begin().await?;
    let released = release_device(&mut tx, user_id, device_id).await?;
    if !released {
        return Err(DeviceError::NotLinkedToUser);
    }
    tx.commit().await?;
    Ok(())
}

/// Unlink whatever device the user currently has.
pub async fn unlink_current_device(pool: &SqlitePool, user_id: i64) -> Result<(), DeviceError> {
    let mut tx = pool.begin().await?;

    let linked: Option<String> = sqlx::query_scalar(
        "SELECT linked_device_id FROM users WHERE id = $1 AND is_active = 1",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .flatten();

    let device_id = linked.ok_or(DeviceError::NoDeviceLinked)?;
    release_device(&mut tx, user_id, &device_id).await?;

    tx.commit().await?;
    Ok(())
}

async fn release_device(
    conn: &mut SqliteConnection,
    user_id: i64,
    device_id: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let devices = sqlx::query(
        r#"
        UPDATE wearable_devices SET is_active = 0, updated_at = $3
        WHERE user_id = $1 AND device_id = $2 AND is_active = 1
        "#,
    )
    .bind(user_id)
    .bind(device_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let users = sqlx::query(
        r#"
        UPDATE users SET linked_device_id = NULL, device_linked_at = NULL, updated_at = $3
        WHERE id = $1 AND linked_device_id = $2
        "#,
    )
    .bind(user_id)
    .bind(device_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(devices.rows_affected() > 0 || users.rows_affected() > 0)
}

pub async fn list_devices(pool: &SqlitePool, user_id: i64) -> Result<Vec<WearableDevice>, sqlx::Error> {
    sqlx::query_as::<_, WearableDevice>(&format!(
        "SELECT {} FROM wearable_devices WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        DEVICE_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn active_device_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<WearableDevice>, sqlx::Error> {
    sqlx::query_as::<_, WearableDevice>(&format!(
        "SELECT {} FROM wearable_devices WHERE user_id = $1 AND is_active = 1 ORDER BY updated_at DESC LIMIT 1",
        DEVICE_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Owner (user id, email) of an actively linked device.
pub async fn find_active_owner(
    pool: &SqlitePool,
    device_id: &str,
) -> Result<Option<(i64, String)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, String)>(
        r#"
        SELECT u.id, u.email
        FROM wearable_devices d
        JOIN users u ON u.id = d.user_id
        WHERE d.device_id = $1 AND d.is_active = 1 AND u.is_active = 1
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await
}

/// Store one telemetry sample and mark the device as synced.
pub async fn insert_reading(
    pool: &SqlitePool,
    device_id: &str,
    user_id: i64,
    timestamp: DateTime<Utc>,
    readings: &SensorReadings,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now();
    let ecg = serde_json::to_string(&readings.ecg_mv).unwrap_or_else(|_| "[]".to_string());
    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO device_data (
            device_id, user_id, timestamp, temperature_c, temperature_f, heart_rate_bpm, spo2_percent,
            ecg_data, blood_pressure_systolic, blood_pressure_diastolic, steps, calories_burned,
            data_quality, battery_level, signal_strength, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING id
        "#,
    )
    .bind(device_id)
    .bind(user_id)
    .bind(timestamp)
    .bind(readings.temperature_c)
    .bind(readings.temperature_f())
    .bind(readings.heart_rate_bpm)
    .bind(readings.spo2_percent)
    .bind(ecg)
    .bind(readings.blood_pressure_systolic)
    .bind(readings.blood_pressure_diastolic)
    .bind(readings.steps)
    .bind(readings.calories_burned)
    .bind(readings.data_quality.as_deref().unwrap_or("good"))
    .bind(readings.battery_level)
    .bind(readings.signal_strength)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE wearable_devices SET last_sync = $2, updated_at = $2 WHERE device_id = $1")
        .bind(device_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(id)
}

/// Oldest first, from `since` onwards.
pub async fn readings_since(
    pool: &SqlitePool,
    user_id: i64,
    device_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<DeviceDataRecord>, sqlx::Error> {
    sqlx::query_as::<_, DeviceDataRecord>(&format!(
        r#"
        SELECT {} FROM device_data
        WHERE user_id = $1 AND device_id = $2 AND timestamp >= $3
        ORDER BY timestamp ASC, id ASC
        "#,
        READING_COLUMNS
    ))
    .bind(user_id)
    .bind(device_id)
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn latest_reading(
    pool: &SqlitePool,
    user_id: i64,
    device_id: &str,
) -> Result<Option<DeviceDataRecord>, sqlx::Error> {
    sqlx::query_as::<_, DeviceDataRecord>(&format!(
        r#"
        SELECT {} FROM device_data
        WHERE user_id = $1 AND device_id = $2
        ORDER BY timestamp DESC, id DESC
        LIMIT 1
        "#,
        READING_COLUMNS
    ))
    .bind(user_id)
    .bind(device_id)
    .fetch_optional(pool)
    .await
}

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::user::{NewUser, UserRecord};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, name, phone, date_of_birth, gender,
    height, weight, blood_type, allergies, current_medications, medical_conditions,
    emergency_contact_name, emergency_contact_relationship, emergency_contact_phone,
    linked_device_id, device_linked_at, marketing_emails_consent, sms_notifications_consent,
    created_at, updated_at, is_active
"#;

/// Get an active user by (already normalised) email
pub async fn find_active_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {} FROM users WHERE email = $1 AND is_active = 1",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Any account, active or not, holding this email.
pub async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(existing.is_some())
}

pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<UserRecord, sqlx::Error> {
    let now = Utc::now();
    let metadata = &user.metadata;
    let contact = metadata.emergency_contact.clone().unwrap_or_default();
    let preferences = metadata.preferences.clone().unwrap_or_default();

    sqlx::query_as::<_, UserRecord>(&format!(
        r#"
        INSERT INTO users (
            email, password_hash, name, phone, date_of_birth, gender,
            height, weight, blood_type, allergies, current_medications, medical_conditions,
            emergency_contact_name, emergency_contact_relationship, emergency_contact_phone,
            marketing_emails_consent, sms_notifications_consent,
            created_at, updated_at, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18, 1)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(&user.phone)
    .bind(user.date_of_birth)
    .bind(&user.gender)
    .bind(metadata.height)
    .bind(metadata.weight)
    .bind(&metadata.blood_type)
    .bind(&metadata.allergies)
    .bind(&metadata.medications)
    .bind(&metadata.medical_conditions)
    .bind(&contact.name)
    .bind(&contact.relationship)
    .bind(&contact.phone)
    .bind(preferences.marketing_emails.unwrap_or(false))
    .bind(preferences.sms_notifications.unwrap_or(false))
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Persist the editable profile columns of `user` and bump `updated_at`.
pub async fn save_profile(pool: &SqlitePool, user: &UserRecord) -> Result<UserRecord, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(&format!(
        r#"
        UPDATE users SET
            name = $2, phone = $3, date_of_birth = $4, gender = $5,
            height = $6, weight = $7, blood_type = $8, allergies = $9,
            current_medications = $10, medical_conditions = $11,
            emergency_contact_name = $12, emergency_contact_relationship = $13,
            emergency_contact_phone = $14,
            marketing_emails_consent = $15, sms_notifications_consent = $16,
            updated_at = $17
        WHERE id = $1 AND is_active = 1
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.phone)
    .bind(user.date_of_birth)
    .bind(&user.gender)
    .bind(user.height)
    .bind(user.weight)
    .bind(&user.blood_type)
    .bind(&user.allergies)
    .bind(&user.current_medications)
    .bind(&user.medical_conditions)
    .bind(&user.emergency_contact_name)
    .bind(&user.emergency_contact_relationship)
    .bind(&user.emergency_contact_phone)
    .bind(user.marketing_emails_consent)
    .bind(user.sms_notifications_consent)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// Returns false when no active user has this email.
pub async fn update_password(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET password_hash = $2, updated_at = $3 WHERE email = $1 AND is_active = 1",
    )
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Soft-delete an account and release any device linked to it.
pub async fn deactivate_user(pool: &SqlitePool, user_id: i64) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_active = 0, linked_device_id = NULL, device_linked_at = NULL, updated_at = $2
        WHERE id = $1 AND is_active = 1
        "#,
    )
    .bind(user_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE wearable_devices SET is_active = 0, updated_at = $2 WHERE user_id = $1 AND is_active = 1",
    )
    .bind(user_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_active_users(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
        .fetch_one(pool)
        .await
}

pub async fn count_users_registered_since(
    pool: &SqlitePool,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1 AND created_at >= $1")
        .bind(since)
        .fetch_one(pool)
        .await
}

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::conversation::ConversationRecord;

/// Append one message to a conversation log
pub async fn insert_message(
    pool: &SqlitePool,
    user_id: i64,
    conversation_id: &str,
    role: &str,
    content: &str,
    message_type: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO conversations (user_id, conversation_id, message_role, message_content, message_type, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(conversation_id)
    .bind(role)
    .bind(content)
    .bind(message_type)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// The `limit` most recent messages, oldest first.
pub async fn recent_history(
    pool: &SqlitePool,
    user_id: i64,
    conversation_id: &str,
    limit: i64,
) -> Result<Vec<ConversationRecord>, sqlx::Error> {
    sqlx::query_as::<_, ConversationRecord>(
        r#"
        SELECT id, user_id, conversation_id, message_role, message_content, message_type, created_at
        FROM (
            SELECT id, user_id, conversation_id, message_role, message_content, message_type, created_at
            FROM conversations
            WHERE user_id = $1 AND conversation_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3
        )
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .bind(conversation_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn clear_history(
    pool: &SqlitePool,
    user_id: i64,
    conversation_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM conversations WHERE user_id = $1 AND conversation_id = $2")
        .bind(user_id)
        .bind(conversation_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_messages(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Newest first, across all of the user's conversations.
pub async fn latest_messages(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<ConversationRecord>, sqlx::Error> {
    sqlx::query_as::<_, ConversationRecord>(
        r#"
        SELECT id, user_id, conversation_id, message_role, message_content, message_type, created_at
        FROM conversations
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Distinct (user, conversation) pairs.
pub async fn count_conversations(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT DISTINCT user_id, conversation_id FROM conversations)",
    )
    .fetch_one(pool)
    .await
}

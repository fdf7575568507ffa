use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;

use kare_backend::services::llm::UNAVAILABLE_REPLY;

mod common;
use common::utils::{create_test_user, get_authed, spawn_app, spawn_app_with, ScriptedProvider, TestOptions};
use common::ws::{connect, next_event, send_event};

async fn message_count(pool: &sqlx::SqlitePool, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count messages")
}

#[tokio::test]
async fn handshake_requires_a_session_token() {
    let test_app = spawn_app().await;

    let missing = connect_async(format!("{}/ws", test_app.ws_address).as_str()).await;
    match missing {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected a 401 handshake failure, got {:?}", other.map(|_| ())),
    }

    let bad = connect_async(format!("{}/ws?token=not-a-jwt", test_app.ws_address).as_str()).await;
    match bad {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected a 401 handshake failure, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn connection_is_greeted_by_name() {
    let test_app = spawn_app().await;
    let user = create_test_user(&test_app.address).await;

    let (_socket, welcome) = connect(&test_app.ws_address, &user.token).await;
    assert_eq!(welcome["event"], "connection_success");
    assert_eq!(welcome["data"]["message"], format!("Welcome back, {}!", user.name));
}

#[tokio::test]
async fn chat_without_provider_stores_both_sides_and_apologizes() {
    let test_app = spawn_app().await;
    let user = create_test_user(&test_app.address).await;
    let (mut socket, _) = connect(&test_app.ws_address, &user.token).await;

    send_event(&mut socket, "user_input", json!("I have a headache")).await;
    let reply = next_event(&mut socket).await.expect("No reply");
    assert_eq!(reply["event"], "bot_response");
    assert_eq!(reply["data"], UNAVAILABLE_REPLY);

    assert_eq!(message_count(&test_app.db_pool, user.id).await, 2);

    send_event(&mut socket, "get_conversation_history", Value::Null).await;
    let history = next_event(&mut socket).await.expect("No history");
    assert_eq!(history["event"], "conversation_history");
    let entries = history["data"]["history"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["role"], "user");
    assert_eq!(entries[0]["content"], "I have a headache");
    assert_eq!(entries[1]["role"], "assistant");

    send_event(&mut socket, "clear_conversation", Value::Null).await;
    let cleared = next_event(&mut socket).await.expect("No clear confirmation");
    assert_eq!(cleared["event"], "conversation_cleared");
    assert_eq!(message_count(&test_app.db_pool, user.id).await, 0);
    assert_eq!(test_app.cache.len(&user.email), 1);
}

#[tokio::test]
async fn invalid_input_is_answered_with_error_events() {
    let test_app = spawn_app().await;
    let user = create_test_user(&test_app.address).await;
    let (mut socket, _) = connect(&test_app.ws_address, &user.token).await;

    send_event(&mut socket, "user_input", json!("   ")).await;
    let empty = next_event(&mut socket).await.unwrap();
    assert_eq!(empty["event"], "error");
    assert_eq!(empty["data"]["message"], "Message cannot be empty");

    send_event(&mut socket, "user_input", json!(42)).await;
    let invalid = next_event(&mut socket).await.unwrap();
    assert_eq!(invalid["data"]["message"], "Invalid message format");

    send_event(&mut socket, "ping", Value::Null).await;
    let pong = next_event(&mut socket).await.unwrap();
    assert_eq!(pong["event"], "pong");

    assert_eq!(message_count(&test_app.db_pool, user.id).await, 0);
}

#[tokio::test]
async fn provider_reply_is_sent_back() {
    let provider = Arc::new(ScriptedProvider::default());
    let test_app = spawn_app_with(TestOptions { provider: Some(provider.clone()), ..Default::default() }).await;
    let user = create_test_user(&test_app.address).await;
    let (mut socket, _) = connect(&test_app.ws_address, &user.token).await;

    send_event(&mut socket, "send_message", json!({ "message": "hello doctor" })).await;
    let reply = next_event(&mut socket).await.unwrap();
    assert_eq!(reply["data"], "Echo: hello doctor");

    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].len(), 2);
    assert_eq!(prompts[0][0].role.as_str(), "system");
}

#[tokio::test]
async fn attachments_are_stored_as_multimodal_content() {
    let provider = Arc::new(ScriptedProvider::default());
    let test_app = spawn_app_with(TestOptions { provider: Some(provider.clone()), ..Default::default() }).await;
    let user = create_test_user(&test_app.address).await;
    let (mut socket, _) = connect(&test_app.ws_address, &user.token).await;

    send_event(
        &mut socket,
        "user_input",
        json!({ "text": "What is this?", "attachment": { "name": "rash.png", "data": "data:image/png;base64,AAAA" } }),
    )
    .await;
    let reply = next_event(&mut socket).await.unwrap();
    assert_eq!(reply["event"], "bot_response");

    let (content, message_type): (String, String) = sqlx::query_as(
        "SELECT message_content, message_type FROM conversations WHERE user_id = $1 AND message_role = 'user'",
    )
    .bind(user.id)
    .fetch_one(&test_app.db_pool)
    .await
    .unwrap();
    assert!(content.starts_with('['));
    assert_eq!(message_type, "image");

    send_event(&mut socket, "get_conversation_history", Value::Null).await;
    let history = next_event(&mut socket).await.unwrap();
    assert_eq!(history["data"]["history"][0]["content"][1]["type"], "image_url");
}

#[tokio::test]
async fn longer_database_history_wins_the_prompt() {
    let provider = Arc::new(ScriptedProvider::default());
    let test_app = spawn_app_with(TestOptions { provider: Some(provider.clone()), ..Default::default() }).await;
    let user = create_test_user(&test_app.address).await;

    // Two earlier exchanges the in-memory mirror has never seen
    let earlier = Utc::now() - Duration::hours(1);
    for (offset, role) in ["user", "assistant", "user", "assistant"].iter().enumerate() {
        sqlx::query(
            "INSERT INTO conversations (user_id, conversation_id, message_role, message_content, message_type, created_at)
             VALUES ($1, 'default', $2, $3, 'text', $4)",
        )
        .bind(user.id)
        .bind(*role)
        .bind(format!("earlier {}", offset))
        .bind(earlier + Duration::seconds(offset as i64))
        .execute(&test_app.db_pool)
        .await
        .unwrap();
    }

    let (mut socket, _) = connect(&test_app.ws_address, &user.token).await;
    send_event(&mut socket, "user_input", json!("and now my knee hurts")).await;
    next_event(&mut socket).await.unwrap();

    let prompts = provider.prompts.lock().unwrap();
    // system + 4 stored + the new message
    assert_eq!(prompts[0].len(), 6);
    assert_eq!(prompts[0][1].content.text(), "earlier 0");
}

#[tokio::test]
async fn longer_memory_history_wins_the_prompt() {
    let provider = Arc::new(ScriptedProvider::default());
    let test_app = spawn_app_with(TestOptions { provider: Some(provider.clone()), ..Default::default() }).await;
    let user = create_test_user(&test_app.address).await;
    let (mut socket, _) = connect(&test_app.ws_address, &user.token).await;

    send_event(&mut socket, "user_input", json!("first")).await;
    next_event(&mut socket).await.unwrap();

    // Drop the stored rows behind the service's back
    sqlx::query("DELETE FROM conversations WHERE user_id = $1")
        .bind(user.id)
        .execute(&test_app.db_pool)
        .await
        .unwrap();

    send_event(&mut socket, "user_input", json!("second")).await;
    next_event(&mut socket).await.unwrap();

    let prompts = provider.prompts.lock().unwrap();
    // system, first, reply, second
    assert_eq!(prompts[1].len(), 4);
    assert_eq!(prompts[1][1].content.text(), "first");
}

#[tokio::test]
async fn clear_cache_endpoint_empties_the_conversation() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;
    let (mut socket, _) = connect(&test_app.ws_address, &user.token).await;

    send_event(&mut socket, "user_input", json!("hello")).await;
    next_event(&mut socket).await.unwrap();

    let response = get_authed(&client, &format!("{}/api/clear-cache", &test_app.address), &user.token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Cleared 2 conversation messages");
    assert_eq!(message_count(&test_app.db_pool, user.id).await, 0);
}

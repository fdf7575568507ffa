use reqwest::Client;
use serde_json::{json, Value};

mod common;
use common::utils::{create_test_user, get_authed, login, post_authed, spawn_app};

#[tokio::test]
async fn update_profile_merges_fields() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;

    let response = client
        .put(&format!("{}/api/profile", &test_app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .json(&json!({
            "name": "Pat Updated",
            "date_of_birth": "1985-02-03",
            "metadata": {
                "health": {"height": 172, "allergies": "penicillin"},
                "emergency_contact": {"name": "Jo", "relationship": "partner", "phone": "555-0111"},
                "preferences": {"sms_notifications": true}
            }
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["user"]["name"], "Pat Updated");
    assert_eq!(body["user"]["date_of_birth"], "1985-02-03");
    assert_eq!(body["user"]["height"], 172.0);
    assert_eq!(body["user"]["allergies"], "penicillin");
    assert_eq!(body["user"]["emergency_contact_relationship"], "partner");
    assert_eq!(body["user"]["sms_notifications_consent"], true);

    let profile = get_authed(&client, &format!("{}/api/profile", &test_app.address), &user.token).await;
    let profile: Value = profile.json().await.unwrap();
    assert_eq!(profile["user"]["name"], "Pat Updated");
}

#[tokio::test]
async fn update_profile_rejects_future_birth_date() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;

    let response = client
        .put(&format!("{}/api/profile", &test_app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .json(&json!({ "date_of_birth": "2999-01-01" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn deleted_account_can_no_longer_log_in() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;

    let response = client
        .delete(&format!("{}/api/profile", &test_app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let login_response = login(&client, &test_app.address, &user.email, &user.password).await;
    assert_eq!(401, login_response.status().as_u16());

    // The old token still decodes but the account is gone
    let profile = get_authed(&client, &format!("{}/api/profile", &test_app.address), &user.token).await;
    assert_eq!(404, profile.status().as_u16());
}

#[tokio::test]
async fn profile_stats_count_the_users_records() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;

    let vitals = post_authed(
        &client,
        &format!("{}/api/vital-signs", &test_app.address),
        &user.token,
        &json!({ "temperature": 98.6, "heart_rate": 70 }),
    )
    .await;
    assert_eq!(201, vitals.status().as_u16());

    let condition = post_authed(
        &client,
        &format!("{}/api/medical-history", &test_app.address),
        &user.token,
        &json!({ "condition_name": "Asthma" }),
    )
    .await;
    assert_eq!(201, condition.status().as_u16());

    let response = get_authed(&client, &format!("{}/api/profile/stats", &test_app.address), &user.token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let stats = &body["stats"];
    assert_eq!(stats["total_checkups"], 0);
    assert_eq!(stats["vital_records"], 1);
    assert_eq!(stats["medical_conditions"], 1);
    let activities = stats["recent_activities"].as_array().unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["type"], "vital_signs");
    assert_eq!(activities[0]["icon"], "chart");
}

#[tokio::test]
async fn system_stats_count_users_and_conversations() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;
    create_test_user(&test_app.address).await;

    sqlx::query(
        "INSERT INTO conversations (user_id, conversation_id, message_role, message_content, message_type, created_at)
         VALUES ($1, 'default', 'user', 'hello', 'text', $2), ($1, 'default', 'assistant', 'hi', 'text', $2)",
    )
    .bind(user.id)
    .bind(chrono::Utc::now())
    .execute(&test_app.db_pool)
    .await
    .expect("Failed to insert conversation rows");

    let response = get_authed(&client, &format!("{}/api/stats", &test_app.address), &user.token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["users_registered_today"], 2);
    assert_eq!(body["total_conversations"], 1);
}

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

mod common;
use common::utils::{create_test_user, get_authed, post_authed, spawn_app, TestUser};
use common::ws::{connect, next_event, next_event_within};

fn unique_device() -> String {
    format!("ESP32-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

async fn link(client: &Client, address: &str, user: &TestUser, device_id: &str) -> reqwest::Response {
    post_authed(
        client,
        &format!("{}/api/devices/link", address),
        &user.token,
        &json!({ "device_id": device_id, "device_name": "Wrist band" }),
    )
    .await
}

async fn send_telemetry(client: &Client, address: &str, body: &Value) -> reqwest::Response {
    client
        .post(&format!("{}/device", address))
        .json(body)
        .send()
        .await
        .expect("Failed to execute request.")
}

fn sample(device_id: &str) -> Value {
    json!({
        "device_id": device_id,
        "timestamp": Utc::now().to_rfc3339(),
        "data": {
            "temperature_c": 37.0,
            "heart_rate_bpm": 72,
            "spo2_percent": 98,
            "ecg_mV": [0.1, 0.4, -0.2]
        }
    })
}

#[tokio::test]
async fn link_and_list_devices() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;
    let device_id = unique_device();

    let response = link(&client, &test_app.address, &user, &device_id).await;
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Device linked successfully");
    assert_eq!(body["device"]["device_id"], device_id.as_str());
    assert_eq!(body["device"]["device_type"], "ESP32");

    let devices = get_authed(&client, &format!("{}/api/devices", &test_app.address), &user.token).await;
    let devices: Value = devices.json().await.unwrap();
    assert_eq!(devices["devices"].as_array().unwrap().len(), 1);

    let info = get_authed(&client, &format!("{}/api/device/info", &test_app.address), &user.token).await;
    let info: Value = info.json().await.unwrap();
    assert_eq!(info["has_device"], true);
    assert_eq!(info["device_info"]["device_id"], device_id.as_str());
}

#[tokio::test]
async fn short_device_ids_are_rejected() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;

    let response = link(&client, &test_app.address, &user, "abc").await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Device ID must be at least 5 characters");
}

#[tokio::test]
async fn a_device_cannot_belong_to_two_users() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let owner = create_test_user(&test_app.address).await;
    let other = create_test_user(&test_app.address).await;
    let device_id = unique_device();

    assert_eq!(201, link(&client, &test_app.address, &owner, &device_id).await.status().as_u16());

    let response = link(&client, &test_app.address, &other, &device_id).await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Device is already linked to another user");

    // Once released, the other user may take it
    let unlink = client
        .delete(&format!("{}/api/devices/{}/unlink", &test_app.address, device_id))
        .header("Authorization", format!("Bearer {}", owner.token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, unlink.status().as_u16());
    assert_eq!(201, link(&client, &test_app.address, &other, &device_id).await.status().as_u16());
}

#[tokio::test]
async fn relinking_moves_the_users_link() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;
    let first = unique_device();
    let second = unique_device();

    assert_eq!(201, link(&client, &test_app.address, &user, &first).await.status().as_u16());
    let simple = post_authed(
        &client,
        &format!("{}/api/device/link", &test_app.address),
        &user.token,
        &json!({ "device_id": second }),
    )
    .await;
    assert_eq!(200, simple.status().as_u16());
    let simple: Value = simple.json().await.unwrap();
    assert_eq!(simple["device_info"]["device_id"], second.as_str());

    let (linked,): (Option<String>,) = sqlx::query_as("SELECT linked_device_id FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&test_app.db_pool)
        .await
        .unwrap();
    assert_eq!(linked.as_deref(), Some(second.as_str()));

    let (active,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM wearable_devices WHERE user_id = $1 AND is_active = 1",
    )
    .bind(user.id)
    .fetch_one(&test_app.db_pool)
    .await
    .unwrap();
    assert_eq!(active, 1);

    // Telemetry for the released device no longer has an owner
    let response = send_telemetry(&client, &test_app.address, &sample(&first)).await;
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn simple_unlink_without_device_is_a_bad_request() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;

    let response = post_authed(&client, &format!("{}/api/device/unlink", &test_app.address), &user.token, &json!({})).await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No device linked to this user");

    let info = get_authed(&client, &format!("{}/api/device/info", &test_app.address), &user.token).await;
    let info: Value = info.json().await.unwrap();
    assert_eq!(info["has_device"], false);
}

#[tokio::test]
async fn telemetry_validation() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let unlinked = send_telemetry(&client, &test_app.address, &sample("ESP32-UNKNOWN")).await;
    assert_eq!(404, unlinked.status().as_u16());
    let body: Value = unlinked.json().await.unwrap();
    assert_eq!(body["error"], "Device not linked to any user");

    let missing_id = send_telemetry(&client, &test_app.address, &json!({ "timestamp": "2025-01-01T00:00:00Z" })).await;
    assert_eq!(400, missing_id.status().as_u16());

    let missing_ts = send_telemetry(&client, &test_app.address, &json!({ "device_id": "ESP32-UNKNOWN" })).await;
    assert_eq!(400, missing_ts.status().as_u16());
}

#[tokio::test]
async fn telemetry_is_stored_and_charted() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;
    let device_id = unique_device();
    assert_eq!(201, link(&client, &test_app.address, &user, &device_id).await.status().as_u16());

    let response = send_telemetry(&client, &test_app.address, &sample(&device_id)).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Data received successfully");
    assert_eq!(body["data_saved"]["user_id"], user.id);

    let chart = get_authed(&client, &format!("{}/api/device/data?hours=1", &test_app.address), &user.token).await;
    let chart: Value = chart.json().await.unwrap();
    assert_eq!(chart["has_device"], true);
    assert_eq!(chart["data"]["heart_rate"], json!([72]));
    assert_eq!(chart["data"]["temperature_c"], json!([37.0]));
    let fahrenheit = chart["data"]["temperature_f"][0].as_f64().unwrap();
    assert!((fahrenheit - 98.6).abs() < 1e-9);
    assert_eq!(chart["data"]["ecg_data"], json!([[0.1, 0.4, -0.2]]));

    let latest = get_authed(&client, &format!("{}/api/device/data/latest", &test_app.address), &user.token).await;
    let latest: Value = latest.json().await.unwrap();
    assert_eq!(latest["has_data"], true);
    assert_eq!(latest["latest_data"]["spo2_percent"], 98);

    let rows = get_authed(&client, &format!("{}/api/device-data/24h", &test_app.address), &user.token).await;
    assert_eq!(200, rows.status().as_u16());
    let rows: Value = rows.json().await.unwrap();
    assert_eq!(rows["count"], 1);
    assert!(rows["device_data"][0]["id"].is_i64());
}

#[tokio::test]
async fn chart_window_tolerates_odd_hours() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;
    let device_id = unique_device();
    assert_eq!(201, link(&client, &test_app.address, &user, &device_id).await.status().as_u16());
    assert_eq!(200, send_telemetry(&client, &test_app.address, &sample(&device_id)).await.status().as_u16());

    for hours in ["10000000000", "-3", "0", "abc", "9223372036854775807"] {
        let chart = get_authed(
            &client,
            &format!("{}/api/device/data?hours={}", &test_app.address, hours),
            &user.token,
        )
        .await;
        assert_eq!(200, chart.status().as_u16(), "hours={}", hours);
        let chart: Value = chart.json().await.unwrap();
        assert_eq!(chart["data"]["heart_rate"], json!([72]), "hours={}", hours);
    }
}

#[tokio::test]
async fn telemetry_with_null_sensor_fields_is_accepted() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;
    let device_id = unique_device();
    assert_eq!(201, link(&client, &test_app.address, &user, &device_id).await.status().as_u16());

    let body = json!({
        "device_id": device_id,
        "timestamp": Utc::now().to_rfc3339(),
        "data": { "heart_rate_bpm": 64, "ecg_mV": null }
    });
    assert_eq!(200, send_telemetry(&client, &test_app.address, &body).await.status().as_u16());

    let no_data = json!({ "device_id": device_id, "timestamp": Utc::now().to_rfc3339(), "data": null });
    assert_eq!(200, send_telemetry(&client, &test_app.address, &no_data).await.status().as_u16());

    let rows = get_authed(&client, &format!("{}/api/device-data/24h", &test_app.address), &user.token).await;
    let rows: Value = rows.json().await.unwrap();
    assert_eq!(rows["count"], 2);
}

#[tokio::test]
async fn device_data_24h_needs_a_device() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = create_test_user(&test_app.address).await;

    let response = get_authed(&client, &format!("{}/api/device-data/24h", &test_app.address), &user.token).await;
    assert_eq!(400, response.status().as_u16());

    let latest = get_authed(&client, &format!("{}/api/device/data/latest", &test_app.address), &user.token).await;
    let latest: Value = latest.json().await.unwrap();
    assert_eq!(latest["has_device"], false);
}

#[tokio::test]
async fn telemetry_is_pushed_to_the_owner_only() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let owner = create_test_user(&test_app.address).await;
    let bystander = create_test_user(&test_app.address).await;
    let device_id = unique_device();
    assert_eq!(201, link(&client, &test_app.address, &owner, &device_id).await.status().as_u16());

    let (mut owner_phone, _) = connect(&test_app.ws_address, &owner.token).await;
    let (mut owner_laptop, _) = connect(&test_app.ws_address, &owner.token).await;
    let (mut bystander_socket, _) = connect(&test_app.ws_address, &bystander.token).await;

    let response = send_telemetry(&client, &test_app.address, &sample(&device_id)).await;
    assert_eq!(200, response.status().as_u16());

    for socket in [&mut owner_phone, &mut owner_laptop] {
        let event = next_event(socket).await.expect("owner should receive the reading");
        assert_eq!(event["event"], "device_data_update");
        assert_eq!(event["data"]["device_id"], device_id.as_str());
        assert_eq!(event["data"]["heart_rate_bpm"], 72);
        assert_eq!(event["data"]["ecg_data"], json!([0.1, 0.4, -0.2]));
    }

    let nothing = next_event_within(&mut bystander_socket, Duration::from_millis(500)).await;
    assert!(nothing.is_none());
}

use reqwest::Client;
use serde_json::Value;

mod common;
use common::utils::spawn_app;

#[tokio::test]
async fn root_answers_with_plain_text_banner() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(&test_app.address)
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert_eq!(body, "Kare healthcare server is running!");
}

#[tokio::test]
async fn health_reports_missing_provider() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/health", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider"], "none");
    assert!(body["system_message"].as_str().unwrap().ends_with("..."));
}

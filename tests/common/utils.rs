use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use kare_backend::config::settings::{get_config, get_jwt_settings};
use kare_backend::db;
use kare_backend::models::llm::{ChatMessage, LlmError};
use kare_backend::run;
use kare_backend::services::llm::{ChatProvider, SYSTEM_PROMPT};
use kare_backend::services::mailer::{DisabledMailer, MailError, Mailer};
use kare_backend::services::otp_store::InMemoryOtpStore;
use kare_backend::services::{ChatService, ConversationCache, PasswordResetService, SessionRegistry};
use kare_backend::telemetry::{get_subscriber, init_subscriber};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

/// Captures OTP mails instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_otp_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, otp)| otp.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_otp(&self, email: &str, _name: &str, otp: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push((email.to_string(), otp.to_string()));
        Ok(())
    }
}

/// Replies `Echo: <last user text>` and remembers every prompt it saw.
#[derive(Default)]
pub struct ScriptedProvider {
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(&self, _user_email: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let last = messages.last().map(|m| m.content.text()).unwrap_or_default();
        Ok(format!("Echo: {}", last))
    }
}

#[derive(Default)]
pub struct TestOptions {
    pub provider: Option<Arc<dyn ChatProvider>>,
    pub mail_disabled: bool,
}

pub struct TestApp {
    pub address: String,
    pub ws_address: String,
    pub db_pool: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
    pub cache: Arc<ConversationCache>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestOptions::default()).await
}

pub async fn spawn_app_with(options: TestOptions) -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);
    let ws_address = format!("ws://127.0.0.1:{}", port);

    let configuration = get_config().expect("Failed to read configuration.");
    let jwt_settings = get_jwt_settings(&configuration);

    // A fresh database file per test
    let db_path = std::env::temp_dir().join(format!("kare-test-{}.db", Uuid::new_v4()));
    let connection_pool = db::connect(&format!("sqlite://{}", db_path.display()), 4)
        .await
        .expect("Failed to open the test database");
    db::migrate(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    let cache = Arc::new(ConversationCache::new(SYSTEM_PROMPT));
    let chat_service = ChatService::new(connection_pool.clone(), options.provider, cache.clone());

    let mailer = Arc::new(RecordingMailer::default());
    let service_mailer: Arc<dyn Mailer> = if options.mail_disabled {
        Arc::new(DisabledMailer)
    } else {
        mailer.clone()
    };
    let reset_service = PasswordResetService::new(Arc::new(InMemoryOtpStore::new()), service_mailer);

    let server = run(
        listener,
        connection_pool.clone(),
        jwt_settings,
        chat_service,
        SessionRegistry::new(),
        reset_service,
        vec!["http://localhost:3000".to_string()],
    )
    .expect("Failed to bind address");
    // Launch the server as a background task
    let _ = tokio::spawn(server);

    TestApp {
        address,
        ws_address,
        db_pool: connection_pool,
        mailer,
        cache,
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub name: String,
    pub token: String,
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}{}@example.com", prefix, Uuid::new_v4().simple())
}

pub async fn register_user(client: &Client, address: &str, body: &Value) -> reqwest::Response {
    client
        .post(format!("{}/api/register", address))
        .json(body)
        .send()
        .await
        .expect("Failed to execute register request.")
}

/// Register a fresh account and return its session token.
pub async fn create_test_user(address: &str) -> TestUser {
    let client = Client::new();
    let email = unique_email("patient");
    let password = "password123".to_string();
    let name = "Pat Example".to_string();

    let response = register_user(
        &client,
        address,
        &json!({ "email": email, "password": password, "name": name }),
    )
    .await;
    assert_eq!(201, response.status().as_u16(), "registration should succeed");

    let body: Value = response.json().await.expect("Failed to parse register response");
    TestUser {
        id: body["user"]["id"].as_i64().expect("No user id in response"),
        email,
        password,
        name,
        token: body["token"].as_str().expect("No token in response").to_string(),
    }
}

pub async fn login(client: &Client, address: &str, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/api/login", address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute login request.")
}

pub async fn get_authed(client: &Client, url: &str, token: &str) -> reqwest::Response {
    client
        .get(url)
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.")
}

pub async fn post_authed(client: &Client, url: &str, token: &str, body: &Value) -> reqwest::Response {
    client
        .post(url)
        .header("Authorization", format!("Bearer {}", token))
        .json(body)
        .send()
        .await
        .expect("Failed to execute request.")
}

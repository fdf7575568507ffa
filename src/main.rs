use std::net::TcpListener;
use std::sync::Arc;

use secrecy::ExposeSecret;

use kare_backend::config::settings::{get_config, get_jwt_settings};
use kare_backend::db;
use kare_backend::run;
use kare_backend::services::llm::{build_provider, SYSTEM_PROMPT};
use kare_backend::services::mailer::build_mailer;
use kare_backend::services::otp_store::{InMemoryOtpStore, OtpStore, RedisOtpStore};
use kare_backend::services::{ChatService, ConversationCache, PasswordResetService, SessionRegistry};
use kare_backend::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    let subscriber = get_subscriber(
        "kare-backend".into(),
        config.application.log_level.clone(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    // JWT
    let jwt_settings = get_jwt_settings(&config);

    let connection_pool = db::connect(
        config.database.connection_string().expose_secret(),
        config.database.max_connections,
    )
    .await
    .expect("Failed to open the SQLite database");
    db::migrate(&connection_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // AI provider; a missing key leaves the chat answering with the fallback reply
    let provider = build_provider(&config.llm).expect("Failed to build the AI provider client");
    let cache = Arc::new(ConversationCache::new(SYSTEM_PROMPT));
    let chat_service = ChatService::new(connection_pool.clone(), provider, cache);

    // Redis is optional; without it OTPs live in process memory
    let otp_store: Arc<dyn OtpStore> = match &config.redis.url {
        Some(url) => match redis::Client::open(url.expose_secret()) {
            Ok(client) => {
                tracing::info!("Redis client created successfully, OTPs stored in Redis");
                Arc::new(RedisOtpStore::new(client))
            }
            Err(e) => {
                tracing::error!("Failed to create Redis client: {}. Falling back to in-memory OTP store", e);
                Arc::new(InMemoryOtpStore::new())
            }
        },
        None => Arc::new(InMemoryOtpStore::new()),
    };
    let mailer = build_mailer(&config.mail).expect("Failed to configure the SMTP transport");
    let reset_service = PasswordResetService::new(otp_store, mailer);

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Kare healthcare server listening on {}", address);

    run(
        listener,
        connection_pool,
        jwt_settings,
        chat_service,
        SessionRegistry::new(),
        reset_service,
        config.application.allowed_origins.clone(),
    )?
    .await
}

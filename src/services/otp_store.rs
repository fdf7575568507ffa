use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub const OTP_TTL_MINUTES: i64 = 10;
pub const MAX_OTP_ATTEMPTS: u32 = 3;
const MAX_WATCH_RETRIES: usize = 8;

#[derive(Debug, ThisError)]
pub enum OtpError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("OTP record kept changing, giving up")]
    Contention,
}

/// Pending password reset for one email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtpRecord {
    pub otp: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i64,
    pub attempts: u32,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub reset_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpCheck {
    Verified,
    Expired,
    TooManyAttempts,
    AlreadyUsed,
    Mismatch { remaining: u32 },
}

/// What an update does to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordChange {
    Keep,
    Save,
    Remove,
}

impl OtpCheck {
    pub fn record_change(&self) -> RecordChange {
        match self {
            OtpCheck::Verified | OtpCheck::Mismatch { .. } => RecordChange::Save,
            OtpCheck::Expired | OtpCheck::TooManyAttempts => RecordChange::Remove,
            OtpCheck::AlreadyUsed => RecordChange::Keep,
        }
    }
}

impl OtpRecord {
    pub fn new(otp: String, user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            otp,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            user_id,
            attempts: 0,
            verified: false,
            reset_token: None,
        }
    }

    /// Apply one verification attempt. A mismatch increments `attempts`.
    ///
    /// `Expired` and `TooManyAttempts` mean the record must be discarded.
    pub fn check(&mut self, candidate: &str, now: DateTime<Utc>) -> OtpCheck {
        if now > self.expires_at {
            return OtpCheck::Expired;
        }
        if self.attempts >= MAX_OTP_ATTEMPTS {
            return OtpCheck::TooManyAttempts;
        }
        if self.verified {
            return OtpCheck::AlreadyUsed;
        }
        if candidate != self.otp {
            self.attempts += 1;
            return OtpCheck::Mismatch { remaining: MAX_OTP_ATTEMPTS - self.attempts };
        }
        self.verified = true;
        OtpCheck::Verified
    }

    /// One attempt that binds `reset_token` to the record when it verifies.
    pub fn verify(&mut self, candidate: &str, reset_token: &str, now: DateTime<Utc>) -> (OtpCheck, RecordChange) {
        let check = self.check(candidate, now);
        if check == OtpCheck::Verified {
            self.reset_token = Some(reset_token.to_string());
        }
        let change = check.record_change();
        (check, change)
    }

    /// Verified records holding `reset_token` are removed; anything else stays.
    pub fn consume(&self, reset_token: &str) -> (bool, RecordChange) {
        if self.verified && self.reset_token.as_deref() == Some(reset_token) {
            (true, RecordChange::Remove)
        } else {
            (false, RecordChange::Keep)
        }
    }

    pub fn seconds_to_live(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(1) as u64
    }
}

/// Six random digits.
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    (0..6).map(|_| rng.gen_range(0..10).to_string()).collect()
}

/// Pending OTPs by email. Read-modify-write operations are atomic per email.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Replace any pending record.
    async fn put(&self, email: &str, record: &OtpRecord) -> Result<(), OtpError>;

    async fn remove(&self, email: &str) -> Result<(), OtpError>;

    /// Apply one verification attempt. `None` when no OTP is pending.
    async fn verify(
        &self,
        email: &str,
        candidate: &str,
        reset_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpCheck>, OtpError>;

    /// Remove the record if it was verified with `reset_token`. Returns whether it was.
    async fn consume_verified(&self, email: &str, reset_token: &str) -> Result<bool, OtpError>;
}

#[derive(Default)]
pub struct InMemoryOtpStore {
    records: DashMap<String, OtpRecord>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `apply` under the shard lock of `email`.
    fn update_with<T>(&self, email: &str, apply: impl FnOnce(&mut OtpRecord) -> (T, RecordChange)) -> Option<T> {
        match self.records.entry(email.to_string()) {
            Entry::Occupied(mut entry) => {
                let (outcome, change) = apply(entry.get_mut());
                if change == RecordChange::Remove {
                    entry.remove();
                }
                Some(outcome)
            }
            Entry::Vacant(_) => None,
        }
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, email: &str, record: &OtpRecord) -> Result<(), OtpError> {
        self.records.insert(email.to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, email: &str) -> Result<(), OtpError> {
        self.records.remove(email);
        Ok(())
    }

    async fn verify(
        &self,
        email: &str,
        candidate: &str,
        reset_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpCheck>, OtpError> {
        Ok(self.update_with(email, |record| record.verify(candidate, reset_token, now)))
    }

    async fn consume_verified(&self, email: &str, reset_token: &str) -> Result<bool, OtpError> {
        Ok(self.update_with(email, |record| record.consume(reset_token)).unwrap_or(false))
    }
}

/// Records live under `otp:<email>` and expire with the OTP.
pub struct RedisOtpStore {
    client: redis::Client,
}

impl RedisOtpStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(email: &str) -> String {
        format!("otp:{}", email)
    }

    /// Optimistic `WATCH`/`MULTI` update; retried when another client touched the key.
    async fn update_with<T, F>(&self, email: &str, mut apply: F) -> Result<Option<T>, OtpError>
    where
        F: FnMut(&mut OtpRecord) -> (T, RecordChange) + Send,
        T: Send,
    {
        let key = Self::key(email);
        let mut conn = self.client.get_async_connection().await?;

        for _ in 0..MAX_WATCH_RETRIES {
            let _: () = redis::cmd("WATCH").arg(&key).query_async(&mut conn).await?;
            let raw: Option<String> = conn.get(&key).await?;
            let Some(raw) = raw else {
                let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
                return Ok(None);
            };

            let mut record: OtpRecord = serde_json::from_str(&raw)?;
            let (outcome, change) = apply(&mut record);

            let mut pipe = redis::pipe();
            pipe.atomic();
            match change {
                RecordChange::Keep => {
                    let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
                    return Ok(Some(outcome));
                }
                RecordChange::Save => {
                    let ttl = record.seconds_to_live(Utc::now()) as usize;
                    pipe.set_ex(&key, serde_json::to_string(&record)?, ttl).ignore();
                }
                RecordChange::Remove => {
                    pipe.del(&key).ignore();
                }
            }

            // EXEC answers nil when the watched key changed in between
            let committed: Option<()> = pipe.query_async(&mut conn).await?;
            if committed.is_some() {
                return Ok(Some(outcome));
            }
            tracing::debug!("OTP record for {} changed during update, retrying", email);
        }

        Err(OtpError::Contention)
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, email: &str, record: &OtpRecord) -> Result<(), OtpError> {
        let mut conn = self.client.get_async_connection().await?;
        let json_str = serde_json::to_string(record)?;
        let ttl = record.seconds_to_live(Utc::now()) as usize;
        let _: () = conn.set_ex(Self::key(email), json_str, ttl).await?;
        Ok(())
    }

    async fn remove(&self, email: &str) -> Result<(), OtpError> {
        let mut conn = self.client.get_async_connection().await?;
        let _: () = conn.del(Self::key(email)).await?;
        Ok(())
    }

    async fn verify(
        &self,
        email: &str,
        candidate: &str,
        reset_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpCheck>, OtpError> {
        self.update_with(email, |record| record.verify(candidate, reset_token, now))
            .await
    }

    async fn consume_verified(&self, email: &str, reset_token: &str) -> Result<bool, OtpError> {
        Ok(self
            .update_with(email, |record| record.consume(reset_token))
            .await?
            .unwrap_or(false))
    }
}

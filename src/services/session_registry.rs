use actix::{Message, Recipient};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::realtime::RealtimeEvent;

/// Serialized event pushed to a live connection.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct PushEvent(pub String);

pub struct LiveSession {
    pub user_email: String,
    pub connected_at: DateTime<Utc>,
    recipient: Recipient<PushEvent>,
}

/// Live real-time sessions by session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, LiveSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session_id: Uuid, user_email: &str, recipient: Recipient<PushEvent>) {
        self.sessions.insert(
            session_id,
            LiveSession {
                user_email: user_email.to_string(),
                connected_at: Utc::now(),
                recipient,
            },
        );
        tracing::info!(
            "Session {} registered for {} ({} live)",
            session_id,
            user_email,
            self.sessions.len()
        );
    }

    pub fn unregister(&self, session_id: &Uuid) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            tracing::info!(
                "Session {} ({}) removed after {}s",
                session_id,
                session.user_email,
                (Utc::now() - session.connected_at).num_seconds()
            );
        }
    }

    #[cfg(test)]
    pub fn sessions_for(&self, user_email: &str) -> Vec<Uuid> {
        self.sessions
            .iter()
            .filter(|entry| entry.user_email == user_email)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Best-effort fan-out to every session of the user. Returns how many were sent.
    pub fn push_to_user(&self, user_email: &str, event: &RealtimeEvent) -> usize {
        let payload = event.to_text();
        let mut delivered = 0;
        for entry in self.sessions.iter().filter(|entry| entry.user_email == user_email) {
            entry.recipient.do_send(PushEvent(payload.clone()));
            tracing::debug!("Sent {} to {} (session: {})", event.event, user_email, entry.key());
            delivered += 1;
        }
        delivered
    }
}

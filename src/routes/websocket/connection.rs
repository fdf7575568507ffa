use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, StreamHandler};
use actix_web::web;
use actix_web_actors::ws;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::realtime::{ClientEvent, RealtimeEvent};
use crate::services::chat_service::{error_event, ChatUser};
use crate::services::session_registry::PushEvent;
use crate::services::{ChatService, SessionRegistry};

// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// One live chat connection.
///
/// Chat work runs on spawned tasks; results come back through `PushEvent`,
/// the same message the session registry uses for device pushes.
pub struct ChatConnection {
    heartbeat: Instant,
    session_id: Uuid,
    user: ChatUser,
    chat: web::Data<ChatService>,
    sessions: web::Data<SessionRegistry>,
}

impl Actor for ChatConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "ChatConnection started for {} - session: {}",
            self.user.email,
            self.session_id
        );

        self.heartbeat(ctx);
        self.sessions
            .register(self.session_id, &self.user.email, ctx.address().recipient());
        ctx.text(RealtimeEvent::connection_success(&self.user.name).to_text());
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.sessions.unregister(&self.session_id);
        tracing::info!(
            "ChatConnection stopped for {} - session: {}",
            self.user.email,
            self.session_id
        );
    }
}

impl ChatConnection {
    pub fn new(
        user: ChatUser,
        chat: web::Data<ChatService>,
        sessions: web::Data<SessionRegistry>,
    ) -> Self {
        Self {
            heartbeat: Instant::now(),
            session_id: Uuid::new_v4(),
            user,
            chat,
            sessions,
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > CLIENT_TIMEOUT {
                tracing::warn!(
                    "Client heartbeat missed, disconnecting {} - session: {}",
                    act.user.email,
                    act.session_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"ping");
        });
    }

    fn handle_client_event(&self, frame: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let event = match ClientEvent::parse(frame) {
            Ok(event) => event,
            Err(message) => {
                tracing::debug!("Ignoring frame from {}: {}", self.user.email, message);
                ctx.text(RealtimeEvent::error(&message).to_text());
                return;
            }
        };

        match event {
            ClientEvent::UserInput(data) => self.spawn_chat_turn(data, ctx),
            ClientEvent::ClearConversation => self.spawn_clear(ctx),
            ClientEvent::GetConversationHistory => self.spawn_history(ctx),
            ClientEvent::Ping => ctx.text(RealtimeEvent::pong().to_text()),
        }
    }

    fn spawn_chat_turn(&self, data: Value, ctx: &mut ws::WebsocketContext<Self>) {
        let chat = self.chat.clone();
        let user = self.user.clone();
        let addr = ctx.address();

        tokio::spawn(async move {
            let event = match chat.handle_user_input(&user, &data).await {
                Ok(reply) => RealtimeEvent::bot_response(&reply),
                Err(e) => {
                    tracing::warn!("Chat turn failed for {}: {}", user.email, e);
                    error_event(&e)
                }
            };
            addr.do_send(PushEvent(event.to_text()));
        });
    }

    fn spawn_clear(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let chat = self.chat.clone();
        let user = self.user.clone();
        let addr = ctx.address();

        tokio::spawn(async move {
            let event = match chat.clear(&user).await {
                Ok(_) => RealtimeEvent::conversation_cleared(),
                Err(e) => {
                    tracing::error!("Failed to clear conversation for {}: {}", user.email, e);
                    error_event(&e)
                }
            };
            addr.do_send(PushEvent(event.to_text()));
        });
    }

    fn spawn_history(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let chat = self.chat.clone();
        let user = self.user.clone();
        let addr = ctx.address();

        tokio::spawn(async move {
            let event = match chat.history(&user).await {
                Ok(history) => RealtimeEvent::new("conversation_history", json!({ "history": history })),
                Err(e) => {
                    tracing::error!("Failed to load history for {}: {}", user.email, e);
                    error_event(&e)
                }
            };
            addr.do_send(PushEvent(event.to_text()));
        });
    }
}

impl Handler<PushEvent> for ChatConnection {
    type Result = ();

    fn handle(&mut self, msg: PushEvent, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChatConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.heartbeat = Instant::now();
                self.handle_client_event(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(
                    "Unexpected binary frame from {} - session: {}",
                    self.user.email,
                    self.session_id
                );
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(
                    "WebSocket closing for {} - session {}: {:?}",
                    self.user.email,
                    self.session_id,
                    reason
                );
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!("WebSocket protocol error for {}: {}", self.user.email, e);
                ctx.stop();
            }
        }
    }
}

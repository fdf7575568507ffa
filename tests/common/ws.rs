use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open `/ws` with the token in the query string and consume `connection_success`.
pub async fn connect(ws_address: &str, token: &str) -> (WsClient, Value) {
    let url = format!("{}/ws?token={}", ws_address, token);
    let (mut socket, _) = connect_async(url.as_str())
        .await
        .expect("Failed to open WebSocket");
    let welcome = next_event(&mut socket).await.expect("No welcome event");
    (socket, welcome)
}

pub async fn send_event(socket: &mut WsClient, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    socket
        .send(Message::Text(frame))
        .await
        .expect("Failed to send frame");
}

/// Next JSON event, skipping control frames. None after a 5 s silence.
pub async fn next_event(socket: &mut WsClient) -> Option<Value> {
    next_event_within(socket, Duration::from_secs(5)).await
}

pub async fn next_event_within(socket: &mut WsClient, wait: Duration) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(wait, socket.next()).await.ok()??;
        match frame.ok()? {
            Message::Text(text) => return serde_json::from_str(&text).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

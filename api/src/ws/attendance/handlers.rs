//! Live feed for dashboards on the attendance topic.
//!
//! Server pushes `attendance.code_issued` and `attendance.marked` envelopes.
//! Clients may send `{"type":"ping"}` and receive `{"type":"pong"}`; any
//! other client message is ignored.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::broadcast::{Receiver, error::RecvError};
use util::state::AppState;
use util::ws::ATTENDANCE_TOPIC;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
}

/// Next event for a subscriber. A slow client that fell behind skips the
/// missed events instead of being disconnected; `None` once the topic closes.
async fn next_event(rx: &mut Receiver<String>) -> Option<String> {
    loop {
        match rx.recv().await {
            Ok(msg) => return Some(msg),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(topic = ATTENDANCE_TOPIC, skipped, "Subscriber lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// GET `/ws/attendance`
pub async fn attendance_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let manager = state.ws_clone();

    ws.on_upgrade(move |socket: WebSocket| async move {
        let mut rx = manager.subscribe(ATTENDANCE_TOPIC).await;
        let (socket_tx_raw, mut socket_rx) = socket.split();
        let socket_tx = Arc::new(Mutex::new(socket_tx_raw));

        let forward_tx = Arc::clone(&socket_tx);
        let mut forward_task = tokio::spawn(async move {
            while let Some(msg) = next_event(&mut rx).await {
                let mut tx = forward_tx.lock().await;
                if tx.send(Message::Text(msg.into())).await.is_err() {
                    tracing::debug!(topic = ATTENDANCE_TOPIC, "Client went away mid-send");
                    break;
                }
            }
        });

        let reply_tx = Arc::clone(&socket_tx);
        let mut receive_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = socket_rx.next().await {
                match msg {
                    Message::Text(text) => {
                        if let Ok(ClientMessage::Ping) = serde_json::from_str(text.as_str()) {
                            let mut tx = reply_tx.lock().await;
                            if tx
                                .send(Message::Text(r#"{"type":"pong"}"#.into()))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        tokio::select! {
            _ = &mut forward_task => receive_task.abort(),
            _ = &mut receive_task => forward_task.abort(),
        }
        tracing::debug!(topic = ATTENDANCE_TOPIC, "Attendance socket closed");
    })
}

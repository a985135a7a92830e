//! WebSocket support for live update events.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use filmlist_core::{UpdateEvent, UpdatePhase};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Interval between heartbeats.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Server-side messages that are not update events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// The update state machine moved to another phase.
    Phase { phase: UpdatePhase },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::Phase { .. } => "phase",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}

fn event_kind(event: &UpdateEvent) -> &'static str {
    match event {
        UpdateEvent::Started(_) => "started",
        UpdateEvent::Progress(_) => "progress",
        UpdateEvent::Completed(_) => "completed",
        UpdateEvent::FirstCompleted(_) => "first_completed",
        UpdateEvent::Notice(_) => "notice",
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut events = state.notifier().subscribe();
    let mut phases = state.orchestrator().subscribe_phase();

    // Track connection metrics
    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            let (kind, json) = tokio::select! {
                result = events.recv() => match result {
                    Ok(event) => (event_kind(&event), serde_json::to_string(&event)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} events", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Update event channel closed");
                        break;
                    }
                },
                changed = phases.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let msg = WsMessage::Phase { phase: *phases.borrow_and_update() };
                    (msg.kind(), serde_json::to_string(&msg))
                }
                _ = heartbeat.tick() => {
                    let msg = WsMessage::Heartbeat { timestamp: chrono::Utc::now().timestamp() };
                    (msg.kind(), serde_json::to_string(&msg))
                }
            };

            match json {
                Ok(json) => {
                    WS_MESSAGES_SENT.with_label_values(&[kind]).inc();
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Ping(data)) => {
                // Pong is handled automatically by axum
                debug!("Received ping: {:?}", data);
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring client message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

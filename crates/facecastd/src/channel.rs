//! Per-client WebSocket channel.
//!
//! Every text message is a JSON envelope `{"event": ..., "data": ...}`.
//! Clients send `stream` frames; the server answers each with an optional
//! `person_name` followed by `media`.

use crate::engine::EngineHandle;
use crate::greeter::Greeter;
use crate::server::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use facecast_media::encode_base64;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Client → server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Data-URI encoded webcam frame.
    Stream(String),
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Base64 JPEG of the annotated frame.
    Media(String),
    /// A newly recognized identity.
    PersonName(String),
}

/// State owned by one connected client.
pub struct ClientSession {
    id: u64,
    engine: EngineHandle,
    greeter: Greeter,
}

impl ClientSession {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            engine,
            greeter: Greeter::default(),
        }
    }

    /// Handle one inbound text message and return the events to send back, in order.
    ///
    /// Malformed messages and failed frames yield no events.
    pub async fn on_text(&mut self, text: &str) -> Vec<ServerEvent> {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(client = self.id, error = %e, "ignoring unrecognized message");
                return Vec::new();
            }
        };

        match event {
            ClientEvent::Stream(payload) => self.on_stream(payload).await,
        }
    }

    async fn on_stream(&mut self, payload: String) -> Vec<ServerEvent> {
        let outcome = match self.engine.process(payload).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(client = self.id, error = %e, "dropping frame");
                return Vec::new();
            }
        };

        let mut events = Vec::with_capacity(2);
        if let Some(name) = self.greeter.observe(outcome.last_label()) {
            tracing::info!(client = self.id, name = %name, "announcing recognized person");
            events.push(ServerEvent::PersonName(name));
        }
        events.push(ServerEvent::Media(encode_base64(&outcome.jpeg)));
        events
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_client(socket, state.engine))
}

/// Read, process and answer frames one at a time until the client goes away.
async fn serve_client(mut socket: WebSocket, engine: EngineHandle) {
    let mut session = ClientSession::new(engine);
    tracing::info!(client = session.id, "client connected");

    'recv: while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(client = session.id, error = %e, "websocket receive failed");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                for event in session.on_text(&text).await {
                    let body = match serde_json::to_string(&event) {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::warn!(client = session.id, error = %e, "failed to serialize event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(body)).await.is_err() {
                        break 'recv;
                    }
                }
            }
            Message::Close(_) => break,
            // Ping/pong is answered by axum; binary frames are not part of the protocol.
            _ => {}
        }
    }

    tracing::info!(
        client = session.id,
        last_greeted = ?session.greeter.last_greeted(),
        "client disconnected"
    );
}

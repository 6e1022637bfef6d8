//! Live refinement channel
//!
//! One session per connected client. A session is accepted and registered,
//! rejected with `{"error": "not found"}` when the persona does not exist,
//! and otherwise loops: wait for an instruction, push
//! `{"status": "refining"}`, run the refinement and push either
//! `{"status": "success", "data": {...}}` or `{"error": "..."}`.
//! Generation failures never end the session; only disconnects do.
//!
//! The [`ChannelRegistry`] is the sole owner of every connection's outgoing
//! queue. Unregistering drops the queue, which lets the socket writer flush
//! what is left and close the socket.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, Stream, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::persona::PersonaPatch;

use super::AppState;

// ─────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────

/// Server-to-client push message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelMessage {
    /// Refinement result carrying only the changed fields
    Success { status: String, data: PersonaPatch },

    /// Progress notification
    Progress { status: String },

    /// Non-fatal failure (or the terminal not-found rejection)
    Error { error: String },
}

impl ChannelMessage {
    pub fn refining() -> Self {
        ChannelMessage::Progress {
            status: "refining".to_string(),
        }
    }

    pub fn success(data: PersonaPatch) -> Self {
        ChannelMessage::Success {
            status: "success".to_string(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ChannelMessage::Error {
            error: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::error("not found")
    }
}

/// Client-to-server event, decoupled from the socket type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A free-text edit instruction
    Instruction(String),
    /// Graceful disconnect
    Closed,
    /// The transport failed
    Failed(String),
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Persona did not exist at connect time
    Rejected,
    /// Client disconnected
    Closed,
    /// Transport error
    Failed,
    /// A newer connection took over the client id
    Superseded,
}

// ─────────────────────────────────────────────────────────────────
// Channel Registry
// ─────────────────────────────────────────────────────────────────

struct ChannelHandle {
    connection_id: Uuid,
    sender: mpsc::UnboundedSender<ChannelMessage>,
}

/// Maps client id to the outgoing queue of its current connection.
#[derive(Default)]
pub struct ChannelRegistry {
    connections: RwLock<HashMap<String, ChannelHandle>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, superseding any previous one for the same
    /// client id. Returns the new connection's id.
    pub fn register(&self, client_id: &str, sender: mpsc::UnboundedSender<ChannelMessage>) -> Uuid {
        let connection_id = Uuid::new_v4();
        let previous = self.connections.write().insert(
            client_id.to_string(),
            ChannelHandle {
                connection_id,
                sender,
            },
        );
        if let Some(previous) = previous {
            info!(
                client_id = %client_id,
                superseded = %previous.connection_id,
                "Client reconnected; closing previous channel"
            );
        }
        connection_id
    }

    /// Remove the entry if it still belongs to `connection_id`.
    pub fn unregister(&self, client_id: &str, connection_id: Uuid) -> bool {
        let mut connections = self.connections.write();
        match connections.get(client_id) {
            Some(handle) if handle.connection_id == connection_id => {
                connections.remove(client_id);
                debug!(client_id = %client_id, "Channel unregistered");
                true
            }
            _ => false,
        }
    }

    /// Queue a message for the client's connection. Returns false when
    /// that connection is no longer registered or its socket is gone.
    pub fn send(&self, client_id: &str, connection_id: Uuid, message: ChannelMessage) -> bool {
        let connections = self.connections.read();
        match connections.get(client_id) {
            Some(handle) if handle.connection_id == connection_id => {
                handle.sender.send(message).is_ok()
            }
            _ => false,
        }
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        self.connections.read().contains_key(client_id)
    }

    /// Number of open channels
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}

// ─────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────

/// Drive one refinement session until the client goes away.
pub async fn run_session<S>(
    state: &AppState,
    client_id: &str,
    persona_id: &str,
    sender: mpsc::UnboundedSender<ChannelMessage>,
    mut inbound: S,
) -> SessionOutcome
where
    S: Stream<Item = Inbound> + Unpin,
{
    let channels = &state.channels;
    let connection_id = channels.register(client_id, sender);

    if state.store.get(persona_id).is_err() {
        info!(client_id = %client_id, persona_id = %persona_id, "Refinement channel rejected: unknown persona");
        channels.send(client_id, connection_id, ChannelMessage::not_found());
        channels.unregister(client_id, connection_id);
        return SessionOutcome::Rejected;
    }

    info!(client_id = %client_id, persona_id = %persona_id, "Refinement channel open");

    let outcome = loop {
        let instruction = match inbound.next().await {
            Some(Inbound::Instruction(text)) => text,
            Some(Inbound::Closed) | None => break SessionOutcome::Closed,
            Some(Inbound::Failed(reason)) => {
                warn!(client_id = %client_id, error = %reason, "Refinement channel failed");
                channels.send(client_id, connection_id, ChannelMessage::error(reason));
                break SessionOutcome::Failed;
            }
        };

        let delivered = refine_once(state, client_id, connection_id, persona_id, &instruction).await;
        if !delivered {
            break SessionOutcome::Superseded;
        }
    };

    channels.unregister(client_id, connection_id);
    info!(client_id = %client_id, outcome = ?outcome, "Refinement channel closed");
    outcome
}

/// One refine cycle. Returns false once the connection can no longer be
/// reached.
async fn refine_once(
    state: &AppState,
    client_id: &str,
    connection_id: Uuid,
    persona_id: &str,
    instruction: &str,
) -> bool {
    let channels = &state.channels;

    if instruction.trim().is_empty() {
        return channels.send(client_id, connection_id, ChannelMessage::error("empty instruction"));
    }

    if !channels.send(client_id, connection_id, ChannelMessage::refining()) {
        return false;
    }

    // Re-read each cycle so direct HTTP updates are visible to the model
    let result = match state.store.get(persona_id) {
        Ok(record) => state.gateway.refine_persona(&record, instruction).await,
        Err(e) => Err(e),
    };

    let reply = match result.and_then(|patch| {
        state.store.apply_partial(persona_id, &patch)?;
        Ok(patch)
    }) {
        Ok(patch) => {
            info!(persona_id = %persona_id, fields = ?patch.changed_fields(), "Persona refined");
            ChannelMessage::success(patch)
        }
        Err(e) => {
            warn!(persona_id = %persona_id, error = %e, "Refinement failed");
            ChannelMessage::error(e.to_string())
        }
    };

    channels.send(client_id, connection_id, reply)
}

// ─────────────────────────────────────────────────────────────────
// WebSocket adapter
// ─────────────────────────────────────────────────────────────────

/// Run a session over an upgraded WebSocket.
pub async fn serve_socket(socket: WebSocket, state: AppState, client_id: String, persona_id: String) {
    let (mut sink, stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ChannelMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode channel message");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        // Queue dropped by the registry: close our side
        let _ = sink.send(Message::Close(None)).await;
    });

    let inbound = Box::pin(stream.filter_map(|frame| async move {
        match frame {
            Ok(Message::Text(text)) => Some(Inbound::Instruction(text.as_str().to_owned())),
            Ok(Message::Close(_)) => Some(Inbound::Closed),
            Ok(_) => None,
            Err(e) => Some(Inbound::Failed(e.to_string())),
        }
    }));

    run_session(&state, &client_id, &persona_id, tx, inbound).await;

    if let Err(e) = writer.await {
        warn!(error = %e, "Channel writer task failed");
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

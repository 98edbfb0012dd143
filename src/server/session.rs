use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::ws::messages::OutgoingMessage;

/// Authorization role bound at WebSocket handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Gm,
    Player,
}

impl Role {
    pub fn is_gm(self) -> bool {
        matches!(self, Role::Gm)
    }
}

/// A single realtime connection. Ephemeral: created on connect, removed
/// from the hub on disconnect, no state beyond the role. Delivery through
/// `sender` is best-effort; there is no replay for disconnected peers.
pub struct Session {
    pub connection_id: String,
    pub role: Role,
    /// Sender for outgoing WS messages, drained by the socket task.
    pub sender: flume::Sender<Message>,
}

impl Session {
    pub fn new(role: Role, sender: flume::Sender<Message>) -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4().to_string(),
            role,
            sender,
        }
    }

    pub fn send_json(&self, json: &str) {
        let _ = self.sender.send(Message::Text(json.to_string().into()));
    }

    /// Send a typed outgoing message.
    pub fn send_message(&self, msg: &OutgoingMessage) {
        if let Ok(json) = serde_json::to_string(msg) {
            self.send_json(&json);
        }
    }
}

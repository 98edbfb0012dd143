use std::sync::Arc;

use dashmap::DashMap;

use crate::server::session::Session;
use crate::ws::messages::OutgoingMessage;

/// Registry of live connections and the fan-out point for deltas.
///
/// Broadcast is at-most-once per connected peer: a full channel or a peer
/// that disconnects mid-send simply misses the message and catches up on
/// its next full loadScene.
#[derive(Default)]
pub struct SessionHub {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: Arc<Session>) {
        self.sessions
            .insert(session.connection_id.clone(), session);
    }

    pub fn remove(&self, connection_id: &str) {
        self.sessions.remove(connection_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Send to every connection, including the originator.
    pub fn broadcast(&self, msg: &OutgoingMessage) {
        if let Ok(json) = serde_json::to_string(msg) {
            for session in self.sessions.iter() {
                session.send_json(&json);
            }
        }
    }

    /// Send to every connection except the originator, which already holds
    /// the authoritative local value.
    pub fn broadcast_except(&self, sender_id: &str, msg: &OutgoingMessage) {
        if let Ok(json) = serde_json::to_string(msg) {
            for session in self.sessions.iter() {
                if session.connection_id != sender_id {
                    session.send_json(&json);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::session::Role;
    use axum::extract::ws::Message;

    fn connect(hub: &SessionHub, role: Role) -> (String, flume::Receiver<Message>) {
        let (tx, rx) = flume::unbounded();
        let session = Arc::new(Session::new(role, tx));
        let id = session.connection_id.clone();
        hub.register(session);
        (id, rx)
    }

    #[test]
    fn broadcast_reaches_everyone_including_sender() {
        let hub = SessionHub::new();
        let (_gm, gm_rx) = connect(&hub, Role::Gm);
        let (_p1, p1_rx) = connect(&hub, Role::Player);
        assert_eq!(hub.len(), 2);

        hub.broadcast(&OutgoingMessage::ActiveSceneId {
            scene_id: Some("s1".to_string()),
        });
        assert_eq!(gm_rx.len(), 1);
        assert_eq!(p1_rx.len(), 1);
    }

    #[test]
    fn broadcast_except_skips_the_originator() {
        let hub = SessionHub::new();
        let (gm_id, gm_rx) = connect(&hub, Role::Gm);
        let (_p1, p1_rx) = connect(&hub, Role::Player);
        let (_p2, p2_rx) = connect(&hub, Role::Player);

        hub.broadcast_except(
            &gm_id,
            &OutgoingMessage::UpdateToken {
                scene_id: "s1".to_string(),
                token_id: "t1".to_string(),
                properties: crate::scene::TokenPatch {
                    x: Some(20.0),
                    y: Some(20.0),
                    ..Default::default()
                },
            },
        );

        assert_eq!(gm_rx.len(), 0);
        assert_eq!(p1_rx.len(), 1);
        assert_eq!(p2_rx.len(), 1);

        let Message::Text(text) = p1_rx.recv().unwrap() else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["op"], "updateToken");
        assert_eq!(value["sceneId"], "s1");
        assert_eq!(value["tokenId"], "t1");
        assert_eq!(value["properties"]["x"], 20.0);
        assert_eq!(value["properties"]["y"], 20.0);
    }

    #[test]
    fn removed_session_no_longer_receives() {
        let hub = SessionHub::new();
        let (id, rx) = connect(&hub, Role::Player);
        hub.remove(&id);
        assert!(hub.is_empty());
        hub.broadcast(&OutgoingMessage::ActiveSceneId { scene_id: None });
        assert_eq!(rx.len(), 0);
    }
}

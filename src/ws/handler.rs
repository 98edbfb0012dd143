use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tracing::{error, info, warn};

use crate::server::{AppState, Role, Session};
use crate::ws::messages::{IncomingMessage, OutgoingMessage};
use crate::ws::ops::handle_op;

pub async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, role: Role) {
    let (tx, rx) = flume::unbounded();
    let session = Arc::new(Session::new(role, tx));
    let connection_id = session.connection_id.clone();
    state.hub.register(session.clone());
    info!(
        "WebSocket connected: connection={} role={:?} peers={}",
        connection_id,
        role,
        state.hub.len()
    );

    // The current active scene goes to this connection alone, not broadcast.
    let hello = OutgoingMessage::ActiveSceneId {
        scene_id: state.active_scene(),
    };
    if let Ok(json) = serde_json::to_string(&hello) {
        let _ = socket.send(Message::Text(json.into())).await;
    }

    // Main event loop
    loop {
        tokio::select! {
            Ok(msg) = rx.recv_async() => {
                if let Err(e) = socket.send(msg).await {
                    error!("Socket send error: connection={} err={}", connection_id, e);
                    break;
                }
            }
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WebSocket error: connection={} err={}", connection_id, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<IncomingMessage>(&text) {
                            Ok(op) => {
                                // One connection's bad message must never
                                // take down the others; failures go back to
                                // the requester only.
                                if let Err(message) = handle_op(op, &state, &session).await {
                                    session.send_message(&OutgoingMessage::Error { message });
                                }
                            }
                            Err(e) => {
                                warn!("Bad WS msg: connection={} err={}", connection_id, e);
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    state.hub.remove(&connection_id);
    info!(
        "WebSocket disconnected: connection={} peers={}",
        connection_id,
        state.hub.len()
    );
}

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
};

use crate::server::{AppState, Role};

pub mod handler;
pub mod messages;
pub mod ops;

/// WS upgrade endpoint. The connection's role is bound here, once, from the
/// shared GM secret: `authorization` header, or a `password` query parameter
/// for browsers (which cannot set headers on WebSocket requests). Anything
/// else joins as a player.
pub async fn websocket_handler(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let supplied = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(String::from)
        .or_else(|| params.get("password").cloned());

    let role = match supplied {
        Some(password) if password == state.config.server.password => Role::Gm,
        _ => Role::Player,
    };

    ws.on_upgrade(move |socket| handler::handle_socket(socket, state, role))
}

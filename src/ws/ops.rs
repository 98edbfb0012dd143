use std::sync::Arc;

use tracing::{debug, error};

use crate::server::{AppState, Session};
use crate::ws::messages::{IncomingMessage, OutgoingMessage};

/// Dispatch one inbound realtime message.
///
/// Role gating mirrors the HTTP surface: scene switching and token/track
/// creation or destruction are GM-only, while token moves are open to
/// players for tokens flagged `movableByPlayers`. An `Err` here becomes an
/// `error{message}` frame to the requester only, never a broadcast.
pub async fn handle_op(
    op: IncomingMessage,
    state: &Arc<AppState>,
    session: &Arc<Session>,
) -> Result<(), String> {
    match op {
        IncomingMessage::LoadScene { scene_id } => {
            match state.registry.load_scene(&scene_id).await {
                Ok(scene) => session.send_message(&OutgoingMessage::SceneData { scene }),
                Err(e) => {
                    error!("Failed to load scene {}: {}", scene_id, e);
                    return Err("Failed to load scene.".to_string());
                }
            }
        }
        IncomingMessage::ChangeScene { scene_id } => {
            require_gm(session, "changeScene")?;
            state.set_active_scene(scene_id.clone());
            debug!("Active scene changed to {}", scene_id);
            state.hub.broadcast(&OutgoingMessage::ActiveSceneId {
                scene_id: Some(scene_id),
            });
        }
        IncomingMessage::UpdateToken {
            scene_id,
            token_id,
            properties,
        } => {
            properties.validate().map_err(|e| e.to_string())?;
            // An absent scene or token stays a silent no-op even for players;
            // only an existing, non-movable token is an authorization error.
            if !session.role.is_gm()
                && state.registry.token_movable_by_players(&scene_id, &token_id) == Some(false)
            {
                return Err("You are not allowed to move this token.".to_string());
            }
            // Absent scene or token is a silent no-op: no error, no broadcast.
            if let Some(applied) = state.registry.update_token(&scene_id, &token_id, &properties) {
                state.hub.broadcast_except(
                    &session.connection_id,
                    &OutgoingMessage::UpdateToken {
                        scene_id,
                        token_id,
                        properties: applied,
                    },
                );
            }
        }
        IncomingMessage::AddToken { scene_id, token } => {
            require_gm(session, "addToken")?;
            if state.registry.add_token(&scene_id, token.clone()) {
                state
                    .hub
                    .broadcast(&OutgoingMessage::AddToken { scene_id, token });
            }
        }
        IncomingMessage::RemoveToken { scene_id, token_id } => {
            require_gm(session, "removeToken")?;
            if state
                .registry
                .remove_token(&scene_id, &token_id)
                .await
                .is_some()
            {
                state
                    .hub
                    .broadcast(&OutgoingMessage::RemoveToken { scene_id, token_id });
            }
        }
        // Music control is a stateless relay: nothing to apply server-side,
        // the sender already reflects the change locally.
        IncomingMessage::PlayTrack { data } => {
            state
                .hub
                .broadcast_except(&session.connection_id, &OutgoingMessage::PlayTrack { data });
        }
        IncomingMessage::PauseTrack { data } => {
            state
                .hub
                .broadcast_except(&session.connection_id, &OutgoingMessage::PauseTrack { data });
        }
        IncomingMessage::SetTrackVolume { data } => {
            state.hub.broadcast_except(
                &session.connection_id,
                &OutgoingMessage::SetTrackVolume { data },
            );
        }
        IncomingMessage::AddTrack { data } => {
            require_gm(session, "addTrack")?;
            state
                .hub
                .broadcast_except(&session.connection_id, &OutgoingMessage::AddTrack { data });
        }
        IncomingMessage::DeleteTrack { data } => {
            require_gm(session, "deleteTrack")?;
            state
                .hub
                .broadcast_except(&session.connection_id, &OutgoingMessage::DeleteTrack { data });
        }
    }

    Ok(())
}

fn require_gm(session: &Session, op: &str) -> Result<(), String> {
    if session.role.is_gm() {
        Ok(())
    } else {
        Err(format!("{op} requires the GM role."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::next_id;
    use crate::config::{Config, StorageConfig};
    use crate::scene::{MediaType, Token, TokenPatch};
    use crate::server::Role;
    use axum::extract::ws::Message;

    fn temp_state(tag: &str) -> Arc<AppState> {
        let root = std::env::temp_dir().join(format!("vttlink-ops-{tag}-{}", next_id()));
        let config = Config {
            storage: StorageConfig {
                data_dir: root.join("scenes").to_string_lossy().into_owned(),
                upload_dir: root.join("uploads").to_string_lossy().into_owned(),
                music_dir: root.join("music").to_string_lossy().into_owned(),
            },
            ..Config::default()
        };
        Arc::new(AppState::new(config))
    }

    fn connect(state: &AppState, role: Role) -> (Arc<Session>, flume::Receiver<Message>) {
        let (tx, rx) = flume::unbounded();
        let session = Arc::new(Session::new(role, tx));
        state.hub.register(session.clone());
        (session, rx)
    }

    fn recv_op(rx: &flume::Receiver<Message>) -> serde_json::Value {
        let Message::Text(text) = rx.recv().unwrap() else {
            panic!("expected a text frame");
        };
        serde_json::from_str(&text).unwrap()
    }

    fn token(id: &str) -> Token {
        Token {
            token_id: id.to_string(),
            image_url: "/uploads/1-orc.png".to_string(),
            media_type: MediaType::Image,
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 50.0,
            rotation: 0.0,
            z_index: 0,
            movable_by_players: false,
            hidden: false,
            name: String::new(),
        }
    }

    #[tokio::test]
    async fn add_token_broadcasts_to_everyone_including_sender() {
        let state = temp_state("add");
        let scene = state.registry.create_scene("S").await.unwrap();
        let (gm, gm_rx) = connect(&state, Role::Gm);
        let (_player, player_rx) = connect(&state, Role::Player);

        handle_op(
            IncomingMessage::AddToken {
                scene_id: scene.scene_id.clone(),
                token: token("t1"),
            },
            &state,
            &gm,
        )
        .await
        .unwrap();

        for rx in [&gm_rx, &player_rx] {
            let value = recv_op(rx);
            assert_eq!(value["op"], "addToken");
            assert_eq!(value["sceneId"], scene.scene_id);
            assert_eq!(value["token"]["tokenId"], "t1");
            assert_eq!(value["token"]["imageUrl"], "/uploads/1-orc.png");
        }
    }

    #[tokio::test]
    async fn update_token_is_not_echoed_to_the_mover() {
        let state = temp_state("move");
        let scene = state.registry.create_scene("S").await.unwrap();
        state.registry.add_token(&scene.scene_id, token("t1"));
        let (gm, gm_rx) = connect(&state, Role::Gm);
        let (_player, player_rx) = connect(&state, Role::Player);

        handle_op(
            IncomingMessage::UpdateToken {
                scene_id: scene.scene_id.clone(),
                token_id: "t1".to_string(),
                properties: TokenPatch {
                    x: Some(20.0),
                    y: Some(20.0),
                    ..Default::default()
                },
            },
            &state,
            &gm,
        )
        .await
        .unwrap();

        assert_eq!(gm_rx.len(), 0);
        let value = recv_op(&player_rx);
        assert_eq!(value["op"], "updateToken");
        assert_eq!(value["properties"]["x"], 20.0);
        assert_eq!(value["properties"]["y"], 20.0);
    }

    #[tokio::test]
    async fn update_for_missing_token_is_silent() {
        let state = temp_state("silent");
        let scene = state.registry.create_scene("S").await.unwrap();
        let (gm, _gm_rx) = connect(&state, Role::Gm);
        let (_player, player_rx) = connect(&state, Role::Player);

        let result = handle_op(
            IncomingMessage::UpdateToken {
                scene_id: scene.scene_id.clone(),
                token_id: "ghost".to_string(),
                properties: TokenPatch {
                    x: Some(1.0),
                    ..Default::default()
                },
            },
            &state,
            &gm,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(player_rx.len(), 0);
    }

    #[tokio::test]
    async fn players_may_only_move_movable_tokens() {
        let state = temp_state("gate");
        let scene = state.registry.create_scene("S").await.unwrap();
        let mut fixed = token("fixed");
        fixed.movable_by_players = false;
        let mut pawn = token("pawn");
        pawn.movable_by_players = true;
        state.registry.add_token(&scene.scene_id, fixed);
        state.registry.add_token(&scene.scene_id, pawn);

        let (player, _rx) = connect(&state, Role::Player);
        let patch = TokenPatch {
            x: Some(5.0),
            ..Default::default()
        };

        let denied = handle_op(
            IncomingMessage::UpdateToken {
                scene_id: scene.scene_id.clone(),
                token_id: "fixed".to_string(),
                properties: patch.clone(),
            },
            &state,
            &player,
        )
        .await;
        assert!(denied.is_err());

        let allowed = handle_op(
            IncomingMessage::UpdateToken {
                scene_id: scene.scene_id.clone(),
                token_id: "pawn".to_string(),
                properties: patch,
            },
            &state,
            &player,
        )
        .await;
        assert!(allowed.is_ok());
    }

    #[tokio::test]
    async fn player_update_for_missing_token_is_silent_too() {
        let state = temp_state("pgate");
        let scene = state.registry.create_scene("S").await.unwrap();
        let (player, player_rx) = connect(&state, Role::Player);
        let (_other, other_rx) = connect(&state, Role::Player);
        let patch = TokenPatch {
            x: Some(5.0),
            ..Default::default()
        };

        // Absent token and absent scene both stay no-ops for players: no
        // error frame, no broadcast, same as the GM path.
        let missing_token = handle_op(
            IncomingMessage::UpdateToken {
                scene_id: scene.scene_id.clone(),
                token_id: "ghost".to_string(),
                properties: patch.clone(),
            },
            &state,
            &player,
        )
        .await;
        assert!(missing_token.is_ok());

        let missing_scene = handle_op(
            IncomingMessage::UpdateToken {
                scene_id: "ghost".to_string(),
                token_id: "t1".to_string(),
                properties: patch,
            },
            &state,
            &player,
        )
        .await;
        assert!(missing_scene.is_ok());
        assert_eq!(player_rx.len(), 0);
        assert_eq!(other_rx.len(), 0);
    }

    #[tokio::test]
    async fn players_cannot_change_scene_or_add_tokens() {
        let state = temp_state("deny");
        let scene = state.registry.create_scene("S").await.unwrap();
        let (player, _rx) = connect(&state, Role::Player);

        assert!(
            handle_op(
                IncomingMessage::ChangeScene {
                    scene_id: scene.scene_id.clone(),
                },
                &state,
                &player,
            )
            .await
            .is_err()
        );
        assert_eq!(state.active_scene(), None);

        assert!(
            handle_op(
                IncomingMessage::AddToken {
                    scene_id: scene.scene_id.clone(),
                    token: token("t1"),
                },
                &state,
                &player,
            )
            .await
            .is_err()
        );
    }

    #[tokio::test]
    async fn change_scene_broadcasts_to_all() {
        let state = temp_state("change");
        let scene = state.registry.create_scene("S").await.unwrap();
        let (gm, gm_rx) = connect(&state, Role::Gm);
        let (_player, player_rx) = connect(&state, Role::Player);

        handle_op(
            IncomingMessage::ChangeScene {
                scene_id: scene.scene_id.clone(),
            },
            &state,
            &gm,
        )
        .await
        .unwrap();

        assert_eq!(state.active_scene(), Some(scene.scene_id.clone()));
        for rx in [&gm_rx, &player_rx] {
            let value = recv_op(rx);
            assert_eq!(value["op"], "activeSceneId");
            assert_eq!(value["sceneId"], scene.scene_id);
        }
    }

    #[tokio::test]
    async fn load_scene_answers_the_requester_only() {
        let state = temp_state("load");
        let scene = state.registry.create_scene("Forest").await.unwrap();
        state.registry.add_token(&scene.scene_id, token("t1"));
        let (requester, req_rx) = connect(&state, Role::Player);
        let (_other, other_rx) = connect(&state, Role::Player);

        handle_op(
            IncomingMessage::LoadScene {
                scene_id: scene.scene_id.clone(),
            },
            &state,
            &requester,
        )
        .await
        .unwrap();

        let value = recv_op(&req_rx);
        assert_eq!(value["op"], "sceneData");
        assert_eq!(value["scene"]["sceneName"], "Forest");
        assert_eq!(value["scene"]["tokens"][0]["tokenId"], "t1");
        assert_eq!(other_rx.len(), 0);

        let failed = handle_op(
            IncomingMessage::LoadScene {
                scene_id: "ghost".to_string(),
            },
            &state,
            &requester,
        )
        .await;
        assert_eq!(failed.unwrap_err(), "Failed to load scene.");
        assert_eq!(other_rx.len(), 0);
    }

    #[tokio::test]
    async fn music_relay_skips_the_sender() {
        let state = temp_state("music");
        let (gm, gm_rx) = connect(&state, Role::Gm);
        let (_player, player_rx) = connect(&state, Role::Player);

        handle_op(
            IncomingMessage::PlayTrack {
                data: serde_json::json!({"trackId": "m1", "volume": 0.8}),
            },
            &state,
            &gm,
        )
        .await
        .unwrap();

        assert_eq!(gm_rx.len(), 0);
        let value = recv_op(&player_rx);
        assert_eq!(value["op"], "playTrack");
        assert_eq!(value["data"]["trackId"], "m1");

        // Track deletion is destructive and stays GM-only.
        let (player2, _rx2) = connect(&state, Role::Player);
        assert!(
            handle_op(
                IncomingMessage::DeleteTrack {
                    data: serde_json::json!({"filename": "m1.mp3"}),
                },
                &state,
                &player2,
            )
            .await
            .is_err()
        );
    }

    #[tokio::test]
    async fn remove_token_broadcasts_to_all() {
        let state = temp_state("remove");
        let scene = state.registry.create_scene("S").await.unwrap();
        state.registry.add_token(&scene.scene_id, token("t1"));
        let (gm, gm_rx) = connect(&state, Role::Gm);
        let (_player, player_rx) = connect(&state, Role::Player);

        handle_op(
            IncomingMessage::RemoveToken {
                scene_id: scene.scene_id.clone(),
                token_id: "t1".to_string(),
            },
            &state,
            &gm,
        )
        .await
        .unwrap();

        for rx in [&gm_rx, &player_rx] {
            let value = recv_op(rx);
            assert_eq!(value["op"], "removeToken");
            assert_eq!(value["tokenId"], "t1");
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scene::{Scene, Token, TokenPatch};

/// Inbound realtime messages, `op`-tagged JSON.
///
/// Music relays carry an opaque `data` payload; the server never interprets
/// it, it only fans it out.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IncomingMessage {
    LoadScene {
        scene_id: String,
    },
    ChangeScene {
        scene_id: String,
    },
    UpdateToken {
        scene_id: String,
        token_id: String,
        properties: TokenPatch,
    },
    AddToken {
        scene_id: String,
        token: Token,
    },
    RemoveToken {
        scene_id: String,
        token_id: String,
    },
    PlayTrack {
        #[serde(default)]
        data: Value,
    },
    PauseTrack {
        #[serde(default)]
        data: Value,
    },
    SetTrackVolume {
        #[serde(default)]
        data: Value,
    },
    DeleteTrack {
        #[serde(default)]
        data: Value,
    },
    AddTrack {
        #[serde(default)]
        data: Value,
    },
}

/// Outbound realtime messages. This is the bit-exact wire contract clients
/// interop against.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutgoingMessage {
    ActiveSceneId {
        scene_id: Option<String>,
    },
    SceneData {
        scene: Scene,
    },
    UpdateToken {
        scene_id: String,
        token_id: String,
        properties: TokenPatch,
    },
    AddToken {
        scene_id: String,
        token: Token,
    },
    RemoveToken {
        scene_id: String,
        token_id: String,
    },
    PlayTrack {
        data: Value,
    },
    PauseTrack {
        data: Value,
    },
    SetTrackVolume {
        data: Value,
    },
    DeleteTrack {
        data: Value,
    },
    AddTrack {
        data: Value,
    },
    Error {
        message: String,
    },
}

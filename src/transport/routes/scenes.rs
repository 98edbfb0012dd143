use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::common::{ApiError, VttError};
use crate::scene::{Scene, SceneSummary};
use crate::server::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSceneRequest {
    pub scene_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSceneResponse {
    pub scene_id: String,
}

#[derive(Serialize)]
pub struct ScenesResponse {
    pub scenes: Vec<SceneSummary>,
}

#[derive(Deserialize)]
pub struct UpdateSceneRequest {
    pub scene: Scene,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSceneRequest {
    pub scene_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneOrderRequest {
    pub scene_order: Vec<String>,
}

/// POST /createScene
pub async fn create_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSceneRequest>,
) -> Result<Json<CreateSceneResponse>, ApiError> {
    match state.registry.create_scene(&req.scene_name).await {
        Ok(scene) => Ok(Json(CreateSceneResponse {
            scene_id: scene.scene_id,
        })),
        Err(e) => {
            error!("Error creating scene: {}", e);
            Err(ApiError::from_err(&e, "/createScene"))
        }
    }
}

/// GET /scenes (public)
pub async fn get_scenes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScenesResponse>, ApiError> {
    match state.registry.list_scenes().await {
        Ok(scenes) => Ok(Json(ScenesResponse { scenes })),
        Err(e) => {
            error!("Error getting scenes: {}", e);
            Err(ApiError::internal("Error getting scenes.", "/scenes"))
        }
    }
}

/// POST /updateScene — full scene overwrite; picked up by the next
/// autosave tick.
pub async fn update_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateSceneRequest>,
) -> Json<serde_json::Value> {
    state.registry.replace_scene(req.scene);
    Json(json!({ "message": "Scene updated." }))
}

/// POST /deleteScene
pub async fn delete_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteSceneRequest>,
) -> impl IntoResponse {
    // Load defensively first; deletion requires residency so the orphan
    // sweep can see the scene's tokens.
    let loaded = state.registry.load_scene(&req.scene_id).await;
    let result = match loaded {
        Ok(_) => state.registry.delete_scene(&req.scene_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e @ VttError::SceneNotFound(_)) => {
            error!("Error deleting scene: {}", e);
            (
                e.status(),
                Json(json!({ "success": false, "message": "Scene not found." })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Error deleting scene: {}", e);
            (
                e.status(),
                Json(json!({ "success": false, "message": "Error deleting scene." })),
            )
                .into_response()
        }
    }
}

/// POST /updateSceneOrder — immediate, durable reordering.
pub async fn update_scene_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SceneOrderRequest>,
) -> Json<serde_json::Value> {
    match state.registry.update_scene_order(&req.scene_order).await {
        Ok(()) => Json(json!({ "success": true })),
        Err(e) => {
            error!("Error updating scene order: {}", e);
            Json(json!({ "success": false, "message": "Failed to update scene order" }))
        }
    }
}

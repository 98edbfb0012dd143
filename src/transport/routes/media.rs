use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::common::{ApiError, VttError};
use crate::media::MusicTrack;
use crate::scene::MediaType;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
    pub media_type: MediaType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicUploadResponse {
    pub success: bool,
    pub music_url: String,
    pub filename: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicListResponse {
    pub success: bool,
    pub music_tracks: Vec<MusicTrack>,
}

#[derive(Deserialize)]
pub struct DeleteMusicRequest {
    pub filename: String,
}

struct UploadedFile {
    name: String,
    mime: String,
    data: Bytes,
}

/// Pull the first matching file field out of a multipart body.
async fn read_file_field(
    multipart: &mut Multipart,
    accepted: &[&str],
    path: &str,
) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string(), path))?
    {
        let Some(field_name) = field.name() else {
            continue;
        };
        if !accepted.contains(&field_name) {
            continue;
        }
        let name = field.file_name().unwrap_or("unnamed").to_string();
        let mime = field.content_type().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string(), path))?;
        return Ok(UploadedFile { name, mime, data });
    }
    Err(ApiError::bad_request("No file uploaded.", path))
}

/// POST /upload — token media (image/video).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = read_file_field(&mut multipart, &["file", "image"], "/upload").await?;
    match state
        .media
        .store_upload(&file.name, &file.mime, &file.data)
        .await
    {
        Ok((image_url, media_type)) => Ok(Json(UploadResponse {
            image_url,
            media_type,
        })),
        Err(e) => {
            error!("Upload error: {}", e);
            Err(ApiError::from_err(&e, "/upload"))
        }
    }
}

/// POST /uploadMusic — audio only.
pub async fn upload_music(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let file = match read_file_field(&mut multipart, &["music"], "/uploadMusic").await {
        Ok(file) => file,
        Err(e) => {
            return (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": e.message })),
            )
                .into_response();
        }
    };

    match state
        .media
        .store_music(&file.name, &file.mime, &file.data)
        .await
    {
        Ok((music_url, filename)) => Json(MusicUploadResponse {
            success: true,
            music_url,
            filename,
        })
        .into_response(),
        Err(e) => {
            error!("Music upload error: {}", e);
            (
                e.status(),
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /musicList (public)
pub async fn music_list(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.media.music_list().await {
        Ok(music_tracks) => Json(MusicListResponse {
            success: true,
            music_tracks,
        })
        .into_response(),
        Err(e) => {
            error!("Error reading music directory: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Error reading music directory." })),
            )
                .into_response()
        }
    }
}

/// POST /deleteMusic
pub async fn delete_music(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteMusicRequest>,
) -> impl IntoResponse {
    if req.filename.is_empty() {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "No filename provided." })),
        )
            .into_response();
    }

    match state.media.delete_music(&req.filename).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e @ VttError::FileNotFound(_)) => (
            e.status(),
            Json(json!({ "success": false, "message": "File not found." })),
        )
            .into_response(),
        Err(e) => {
            error!("Error deleting music file: {}", e);
            (
                e.status(),
                Json(json!({ "success": false, "message": "Error deleting file." })),
            )
                .into_response()
        }
    }
}

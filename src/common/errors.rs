use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::common::now_ms;

/// Domain error taxonomy for the scene/token core.
#[derive(Debug, Error)]
pub enum VttError {
    #[error("scene not found: {0}")]
    SceneNotFound(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VttError {
    pub fn status(&self) -> StatusCode {
        match self {
            VttError::SceneNotFound(_) | VttError::FileNotFound(_) => StatusCode::NOT_FOUND,
            VttError::Validation(_) => StatusCode::BAD_REQUEST,
            VttError::Io(_) | VttError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response envelope for the HTTP surface.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status reason phrase (e.g. "Bad Request").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// The request path that caused the error.
    pub path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: now_ms(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, path)
    }

    pub fn internal(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, path)
    }

    pub fn from_err(err: &VttError, path: impl Into<String>) -> Self {
        Self::new(err.status(), err.to_string(), path)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

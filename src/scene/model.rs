use serde::{Deserialize, Serialize};

use crate::common::VttError;

/// Media kind of a token, fixed at creation from the upload MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// A positionable piece of media inside a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub token_id: String,
    /// Media asset URL, e.g. `/uploads/1724567890123-orc.png`. May be shared
    /// by tokens across scenes; reference-counted before deletion.
    pub image_url: String,
    #[serde(default)]
    pub media_type: MediaType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Paint order, also interaction precedence.
    #[serde(default)]
    pub z_index: i64,
    #[serde(default)]
    pub movable_by_players: bool,
    /// GM-only visibility when set.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub name: String,
}

/// The authoritative server-side scene record, persisted one file per scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub scene_id: String,
    pub scene_name: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
    /// Display rank; legacy scenes without one sort first.
    #[serde(default)]
    pub order: i64,
    /// Pending unsaved changes. Transient, never persisted.
    #[serde(skip)]
    pub dirty: bool,
}

impl Scene {
    pub fn new(scene_id: impl Into<String>, scene_name: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            scene_name: scene_name.into(),
            tokens: Vec::new(),
            order: 0,
            dirty: false,
        }
    }

    pub fn find_token(&self, token_id: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.token_id == token_id)
    }

    pub fn summary(&self) -> SceneSummary {
        SceneSummary {
            scene_id: self.scene_id.clone(),
            scene_name: self.scene_name.clone(),
            order: self.order,
        }
    }
}

/// Listing row for scene enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    pub scene_id: String,
    pub scene_name: String,
    #[serde(default)]
    pub order: i64,
}

/// Closed set of updatable token fields.
///
/// Clients can only patch what is enumerated here; unknown JSON fields are
/// dropped at deserialization and can never reach the persisted model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movable_by_players: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
}

impl TokenPatch {
    /// Reject non-finite coordinates and non-positive sizes before any field
    /// is applied; an invalid patch must not leave partial state behind.
    pub fn validate(&self) -> Result<(), VttError> {
        for (field, value) in [("x", self.x), ("y", self.y), ("rotation", self.rotation)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(VttError::Validation(format!("{field} must be finite")));
                }
            }
        }
        for (field, value) in [("width", self.width), ("height", self.height)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(VttError::Validation(format!(
                        "{field} must be a positive finite number"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn apply(&self, token: &mut Token) {
        if let Some(x) = self.x {
            token.x = x;
        }
        if let Some(y) = self.y {
            token.y = y;
        }
        if let Some(width) = self.width {
            token.width = width;
        }
        if let Some(height) = self.height {
            token.height = height;
        }
        if let Some(rotation) = self.rotation {
            token.rotation = rotation;
        }
        if let Some(z_index) = self.z_index {
            token.z_index = z_index;
        }
        if let Some(movable) = self.movable_by_players {
            token.movable_by_players = movable;
        }
        if let Some(hidden) = self.hidden {
            token.hidden = hidden;
        }
        if let Some(name) = &self.name {
            token.name = name.clone();
        }
        if let Some(url) = &self.image_url {
            token.image_url = url.clone();
        }
        if let Some(media_type) = self.media_type {
            token.media_type = media_type;
        }
    }
}

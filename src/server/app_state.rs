use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::media::MediaStore;
use crate::scene::{SceneRegistry, SceneStore};
use crate::server::session_manager::SessionHub;

/// Top-level application state, owned by the process entry point and
/// injected everywhere via axum `State` rather than hidden globals.
pub struct AppState {
    pub registry: Arc<SceneRegistry>,
    pub media: Arc<MediaStore>,
    pub hub: SessionHub,
    /// Which scene is currently presented to players. None until the GM
    /// first changes scene after startup.
    active_scene_id: RwLock<Option<String>>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let media = Arc::new(MediaStore::new(&config.storage));
        let registry = Arc::new(SceneRegistry::new(
            SceneStore::new(&config.storage.data_dir),
            media.clone(),
        ));
        Self {
            registry,
            media,
            hub: SessionHub::new(),
            active_scene_id: RwLock::new(None),
            config,
        }
    }

    pub fn active_scene(&self) -> Option<String> {
        self.active_scene_id.read().clone()
    }

    pub fn set_active_scene(&self, scene_id: String) {
        *self.active_scene_id.write() = Some(scene_id);
    }
}

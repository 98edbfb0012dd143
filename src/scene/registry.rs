use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::common::{VttError, next_id};
use crate::media::MediaStore;
use crate::scene::model::{Scene, SceneSummary, Token, TokenPatch};
use crate::scene::store::SceneStore;

/// Single source of truth for all loaded scene state.
///
/// Scenes stay resident once loaded; every mutation goes through `&self`
/// methods and runs synchronously under the map's per-entry lock, so two
/// operations can never race on the same scene. Guards are never held
/// across an await: the disk work (saves, orphan sweeps, media deletion)
/// always happens after the mutating section releases its entry.
pub struct SceneRegistry {
    scenes: DashMap<String, Scene>,
    store: SceneStore,
    media: Arc<MediaStore>,
}

impl SceneRegistry {
    pub fn new(store: SceneStore, media: Arc<MediaStore>) -> Self {
        Self {
            scenes: DashMap::new(),
            store,
            media,
        }
    }

    /// Create an empty scene under a fresh collision-proof id and persist it
    /// before returning, so a crash right after creation cannot lose it.
    pub async fn create_scene(&self, scene_name: &str) -> Result<Scene, VttError> {
        let scene = Scene::new(next_id(), scene_name);
        self.store.save(&scene).await?;
        self.scenes.insert(scene.scene_id.clone(), scene.clone());
        info!("Scene {} created ({})", scene.scene_id, scene.scene_name);
        Ok(scene)
    }

    /// Resident copy if present, otherwise read from disk and cache.
    pub async fn load_scene(&self, scene_id: &str) -> Result<Scene, VttError> {
        if let Some(scene) = self.scenes.get(scene_id) {
            return Ok(scene.clone());
        }
        let scene = self.store.load(scene_id).await?;
        debug!("Scene {} loaded", scene_id);
        // A concurrent load may have won the race; keep whichever is resident.
        Ok(self
            .scenes
            .entry(scene_id.to_string())
            .or_insert(scene)
            .clone())
    }

    /// Enumerate all persisted scenes, not just resident ones, so a freshly
    /// restarted process sees its full history.
    pub async fn list_scenes(&self) -> Result<Vec<SceneSummary>, VttError> {
        self.store.load_summaries().await
    }

    /// Merge a validated patch into a resident token. Silent no-op when the
    /// scene or token is absent; a mutation racing a deletion must not fail.
    /// Returns the applied delta for broadcast.
    pub fn update_token(
        &self,
        scene_id: &str,
        token_id: &str,
        patch: &TokenPatch,
    ) -> Option<TokenPatch> {
        let mut scene = self.scenes.get_mut(scene_id)?;
        let token = scene.tokens.iter_mut().find(|t| t.token_id == token_id)?;
        patch.apply(token);
        scene.dirty = true;
        Some(patch.clone())
    }

    /// Append a token. Returns false (no-op) when the scene is absent.
    pub fn add_token(&self, scene_id: &str, token: Token) -> bool {
        match self.scenes.get_mut(scene_id) {
            Some(mut scene) => {
                scene.tokens.push(token);
                scene.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Whether a token may be moved by non-GM connections. `None` when the
    /// scene or token does not exist, so callers can keep the silent no-op
    /// boundary instead of refusing a mutation that races a deletion.
    pub fn token_movable_by_players(&self, scene_id: &str, token_id: &str) -> Option<bool> {
        self.scenes
            .get(scene_id)
            .and_then(|scene| scene.find_token(token_id).map(|t| t.movable_by_players))
    }

    /// Remove a token by id and, when its media asset is no longer
    /// referenced by any token in any known scene, delete the backing file.
    /// Silent no-op when the scene or token is absent.
    pub async fn remove_token(&self, scene_id: &str, token_id: &str) -> Option<Token> {
        let removed = {
            let mut scene = self.scenes.get_mut(scene_id)?;
            let index = scene.tokens.iter().position(|t| t.token_id == token_id)?;
            let token = scene.tokens.remove(index);
            scene.dirty = true;
            token
        };

        if !self.is_media_referenced(&removed.image_url).await {
            self.media.delete_by_url(&removed.image_url).await;
        }
        Some(removed)
    }

    /// Delete a scene's backing file, evict it, and orphan-check every media
    /// asset it referenced. The scene must be resident.
    pub async fn delete_scene(&self, scene_id: &str) -> Result<(), VttError> {
        let tokens = {
            let scene = self
                .scenes
                .get(scene_id)
                .ok_or_else(|| VttError::SceneNotFound(scene_id.to_string()))?;
            scene.tokens.clone()
        };

        self.store.delete(scene_id).await?;
        self.scenes.remove(scene_id);
        info!("Scene {} deleted", scene_id);

        for token in tokens {
            if !self.is_media_referenced(&token.image_url).await {
                self.media.delete_by_url(&token.image_url).await;
            }
        }
        Ok(())
    }

    /// Install a full replacement for a scene and mark it dirty.
    pub fn replace_scene(&self, mut scene: Scene) {
        scene.dirty = true;
        self.scenes.insert(scene.scene_id.clone(), scene);
    }

    /// Assign each scene's rank from its position in the given order and
    /// persist immediately. Reordering is infrequent and must be durable
    /// promptly, so this path bypasses the autosave debounce.
    pub async fn update_scene_order(&self, ordered_ids: &[String]) -> Result<(), VttError> {
        for (rank, scene_id) in ordered_ids.iter().enumerate() {
            self.load_scene(scene_id).await?;
            let snapshot = {
                let mut scene = self
                    .scenes
                    .get_mut(scene_id)
                    .ok_or_else(|| VttError::SceneNotFound(scene_id.to_string()))?;
                scene.order = rank as i64;
                scene.clone()
            };
            self.store.save(&snapshot).await?;
        }
        Ok(())
    }

    /// True when any token in any known scene still references the asset.
    /// Resident scenes are checked first with a short-circuit; persisted but
    /// non-resident scenes are read from disk without being cached.
    pub async fn is_media_referenced(&self, image_url: &str) -> bool {
        for scene in self.scenes.iter() {
            if scene.tokens.iter().any(|t| t.image_url == image_url) {
                return true;
            }
        }

        let ids = match self.store.list_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Orphan sweep could not list persisted scenes: {}", e);
                return false;
            }
        };
        for id in ids {
            if self.scenes.contains_key(&id) {
                continue;
            }
            match self.store.load(&id).await {
                Ok(scene) => {
                    if scene.tokens.iter().any(|t| t.image_url == image_url) {
                        return true;
                    }
                }
                Err(e) => warn!("Orphan sweep skipping scene {}: {}", id, e),
            }
        }
        false
    }

    /// Persist every dirty resident scene. Called from the autosave tick.
    /// The flag is cleared when the snapshot is taken and restored on write
    /// failure, so a mutation landing during a slow write is never lost and
    /// failed writes retry next tick.
    pub async fn flush_dirty(&self) {
        let snapshots: Vec<Scene> = self
            .scenes
            .iter_mut()
            .filter_map(|mut entry| {
                if entry.dirty {
                    entry.dirty = false;
                    Some(entry.clone())
                } else {
                    None
                }
            })
            .collect();

        for scene in snapshots {
            if let Err(e) = self.store.save(&scene).await {
                warn!("Autosave failed for scene {}: {}", scene.scene_id, e);
                if let Some(mut entry) = self.scenes.get_mut(&scene.scene_id) {
                    entry.dirty = true;
                }
            }
        }
    }

    /// Number of dirty resident scenes, for autosave diagnostics.
    pub fn dirty_count(&self) -> usize {
        self.scenes.iter().filter(|s| s.dirty).count()
    }
}

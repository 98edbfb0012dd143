use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::VttError;
use crate::scene::model::{Scene, SceneSummary};

/// Durable store mapping a scene id to one pretty-printed JSON file under
/// the data directory.
pub struct SceneStore {
    dir: PathBuf,
}

impl SceneStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, scene_id: &str) -> PathBuf {
        // Ids are server-generated, but loadScene takes client input.
        let base = Path::new(scene_id)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir.join(format!("{base}.json"))
    }

    pub async fn save(&self, scene: &Scene) -> Result<(), VttError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(scene)?;
        tokio::fs::write(self.path_for(&scene.scene_id), json).await?;
        debug!("Scene {} saved", scene.scene_id);
        Ok(())
    }

    pub async fn load(&self, scene_id: &str) -> Result<Scene, VttError> {
        let path = self.path_for(scene_id);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VttError::SceneNotFound(scene_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&data)?)
    }

    pub async fn delete(&self, scene_id: &str) -> Result<(), VttError> {
        match tokio::fs::remove_file(self.path_for(scene_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VttError::SceneNotFound(scene_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All persisted scene ids, in natural directory order.
    pub async fn list_ids(&self) -> Result<Vec<String>, VttError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // No directory yet means no scenes were ever saved.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Enumerate every persisted scene, sorted by `order` ascending with
    /// ties kept stable in directory order. Unreadable files are skipped.
    pub async fn load_summaries(&self) -> Result<Vec<SceneSummary>, VttError> {
        let mut summaries = Vec::new();
        for id in self.list_ids().await? {
            match self.load(&id).await {
                Ok(scene) => summaries.push(scene.summary()),
                Err(e) => warn!("Skipping unreadable scene file {}: {}", id, e),
            }
        }
        summaries.sort_by_key(|s| s.order);
        Ok(summaries)
    }
}

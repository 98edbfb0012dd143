use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::scene::SceneRegistry;

/// Spawn the periodic dirty-scene flush. This is the only background task
/// in the system; it runs on its own tokio task so a slow disk write never
/// blocks the realtime message path.
pub fn spawn(registry: Arc<SceneRegistry>, interval_ms: u64) -> JoinHandle<()> {
    let period = Duration::from_millis(interval_ms.max(50));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; harmless, nothing is dirty yet.
        loop {
            ticker.tick().await;
            let dirty = registry.dirty_count();
            if dirty > 0 {
                debug!("Autosave tick: {} dirty scene(s)", dirty);
            }
            registry.flush_dirty().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::next_id;
    use crate::config::StorageConfig;
    use crate::media::MediaStore;
    use crate::scene::model::{MediaType, Token, TokenPatch};
    use crate::scene::store::SceneStore;

    fn temp_registry(tag: &str) -> (Arc<SceneRegistry>, SceneStore) {
        let root = std::env::temp_dir().join(format!("vttlink-autosave-{tag}-{}", next_id()));
        let storage = StorageConfig {
            data_dir: root.join("scenes").to_string_lossy().into_owned(),
            upload_dir: root.join("uploads").to_string_lossy().into_owned(),
            music_dir: root.join("music").to_string_lossy().into_owned(),
        };
        let registry = Arc::new(SceneRegistry::new(
            SceneStore::new(&storage.data_dir),
            Arc::new(MediaStore::new(&storage)),
        ));
        (registry, SceneStore::new(&storage.data_dir))
    }

    #[tokio::test]
    async fn dirty_scene_is_flushed_within_a_few_ticks() {
        let (registry, store) = temp_registry("flush");
        let scene = registry.create_scene("S").await.unwrap();
        registry.add_token(
            &scene.scene_id,
            Token {
                token_id: "t1".to_string(),
                image_url: "/uploads/x.png".to_string(),
                media_type: MediaType::Image,
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                rotation: 0.0,
                z_index: 0,
                movable_by_players: false,
                hidden: false,
                name: String::new(),
            },
        );
        registry.update_token(
            &scene.scene_id,
            "t1",
            &TokenPatch {
                x: Some(99.0),
                ..Default::default()
            },
        );

        let task = spawn(registry.clone(), 50);
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if registry.dirty_count() == 0 {
                break;
            }
        }
        task.abort();

        assert_eq!(registry.dirty_count(), 0);
        let persisted = store.load(&scene.scene_id).await.unwrap();
        assert_eq!(persisted.tokens[0].x, 99.0);
    }
}

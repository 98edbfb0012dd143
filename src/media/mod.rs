use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::common::{VttError, now_ms};
use crate::config::StorageConfig;
use crate::scene::MediaType;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];

/// Leading upload-timestamp prefix stripped for display names,
/// e.g. "1724567890123-ambience.mp3" -> "ambience.mp3".
fn display_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\s*[-_]?\s*").unwrap())
}

/// A music file enumerated from the music directory. Tracks live only as
/// files on disk; nothing about them is persisted as structured data.
#[derive(Debug, Clone, Serialize)]
pub struct MusicTrack {
    pub name: String,
    pub filename: String,
    pub url: String,
}

/// Owns the uploaded media and music directories: timestamped storage of
/// uploads, enumeration, and best-effort deletion by broadcast URL.
pub struct MediaStore {
    upload_dir: PathBuf,
    music_dir: PathBuf,
}

impl MediaStore {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&storage.upload_dir),
            music_dir: PathBuf::from(&storage.music_dir),
        }
    }

    /// Map an upload MIME type to a token media kind. Anything that is not
    /// an image or a video is rejected at the door.
    pub fn classify(mime: &str) -> Option<MediaType> {
        if mime.starts_with("image/") {
            Some(MediaType::Image)
        } else if mime.starts_with("video/") {
            Some(MediaType::Video)
        } else {
            None
        }
    }

    /// Strip any directory components from a client-supplied filename.
    fn sanitize_name(name: &str) -> String {
        let flat = name.replace('\\', "/");
        Path::new(&flat)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| n != "." && n != "..")
            .unwrap_or_else(|| "unnamed".to_string())
    }

    /// Store a token media upload. Returns the broadcastable URL and the
    /// media kind derived from the MIME type.
    pub async fn store_upload(
        &self,
        original_name: &str,
        mime: &str,
        data: &[u8],
    ) -> Result<(String, MediaType), VttError> {
        let media_type = Self::classify(mime)
            .ok_or_else(|| VttError::Validation(format!("unsupported file type: {mime}")))?;
        let filename = format!("{}-{}", now_ms(), Self::sanitize_name(original_name));
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(&filename), data).await?;
        info!("Stored upload {}", filename);
        Ok((format!("/uploads/{filename}"), media_type))
    }

    /// Store a music upload. Returns (url, stored filename).
    pub async fn store_music(
        &self,
        original_name: &str,
        mime: &str,
        data: &[u8],
    ) -> Result<(String, String), VttError> {
        if !mime.starts_with("audio/") {
            return Err(VttError::Validation(format!(
                "unsupported file type: {mime}"
            )));
        }
        let filename = format!("{}-{}", now_ms(), Self::sanitize_name(original_name));
        tokio::fs::create_dir_all(&self.music_dir).await?;
        tokio::fs::write(self.music_dir.join(&filename), data).await?;
        info!("Music uploaded: {}", filename);
        Ok((format!("/music/{filename}"), filename))
    }

    /// Enumerate the music directory, audio extensions only.
    pub async fn music_list(&self) -> Result<Vec<MusicTrack>, VttError> {
        let mut tracks = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.music_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(tracks),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().into_owned();
            let is_audio = Path::new(&filename)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if !is_audio {
                continue;
            }
            tracks.push(MusicTrack {
                name: display_name_re().replace(&filename, "").into_owned(),
                url: format!("/music/{filename}"),
                filename,
            });
        }
        Ok(tracks)
    }

    /// Delete a music file by name. The name is reduced to its base name
    /// before resolution so it cannot escape the music directory.
    pub async fn delete_music(&self, filename: &str) -> Result<(), VttError> {
        let safe = Self::sanitize_name(filename);
        let path = self.music_dir.join(&safe);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted music file: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VttError::FileNotFound(safe))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort deletion of an uploaded asset by its broadcast URL.
    /// Failure is logged and swallowed; the token/scene removal that
    /// triggered it is already the source of truth.
    pub async fn delete_by_url(&self, url: &str) {
        let path = match url.strip_prefix("/uploads/") {
            Some(rest) => self.upload_dir.join(Self::sanitize_name(rest)),
            None => match url.strip_prefix("/music/") {
                Some(rest) => self.music_dir.join(Self::sanitize_name(rest)),
                None => {
                    warn!("Refusing to delete media with unknown url prefix: {}", url);
                    return;
                }
            },
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("Deleted unused media file: {}", path.display()),
            Err(e) => warn!("Error deleting media file {}: {}", path.display(), e),
        }
    }
}

//! Persisted snapshot of the last successful live fetch.
//!
//! The snapshot is a single pretty-printed JSON array. It is replaced
//! wholesale on every store (temp file + rename) and never merged.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Post;

/// Default snapshot location, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "temp/reddit_posts.json";

/// File-backed post snapshot.
#[derive(Debug, Clone)]
pub struct PostCache {
    path: PathBuf,
}

impl PostCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. Missing, unreadable, or corrupt files read as empty.
    pub fn load(&self) -> Vec<Post> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache file not found at {}", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!("Error reading cache file {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Post>>(&content) {
            Ok(posts) => {
                info!("Loaded {} posts from cache.", posts.len());
                posts
            }
            Err(e) => {
                warn!("Error parsing cache file {}: {e}", self.path.display());
                Vec::new()
            }
        }
    }

    /// Overwrite the snapshot with `posts`.
    pub fn store(&self, posts: &[Post]) -> Result<(), String> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create cache directory: {e}"))?;
        }

        let json = serde_json::to_string_pretty(posts)
            .map_err(|e| format!("Failed to serialize posts: {e}"))?;

        // One temp file per writer so concurrent stores never share it.
        let tmp_path = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        let written = std::fs::write(&tmp_path, json)
            .map_err(|e| format!("Failed to write temp cache file: {e}"))
            .and_then(|()| {
                std::fs::rename(&tmp_path, &self.path)
                    .map_err(|e| format!("Failed to rename cache file: {e}"))
            });
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        info!(
            "Saved {} posts to cache at {}",
            posts.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl Default for PostCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_FILE)
    }
}

//! Upload store: persists caller-supplied files under random names.

use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

/// Write `bytes` into `dir` as `<uuid><.ext>`, keeping the extension of
/// `original_name` if it has one. Creates `dir` when absent.
pub fn store_upload(dir: &Path, original_name: &str, bytes: &[u8]) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create upload directory {}: {e}", dir.display()))?;

    let file_name = match Path::new(original_name).extension() {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_string_lossy()),
        None => Uuid::new_v4().to_string(),
    };
    let path = dir.join(file_name);

    std::fs::write(&path, bytes)
        .map_err(|e| format!("failed to write upload {}: {e}", path.display()))?;
    info!("File uploaded: {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

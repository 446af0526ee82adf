//! Local storage housekeeping.
//!
//! - [`directory_size_mb`]: recursive disk usage of a directory tree.
//! - [`reap_older_than`]: best-effort deletion of stale files in one
//!   directory (non-recursive).
//! - [`cleanup`]: the quota-triggered policy that composes the two, and the
//!   recurring janitor task that runs it.
//! - [`uploads`]: writes caller-supplied files under unique names.

pub mod cleanup;
pub mod uploads;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub use cleanup::{CleanupPolicy, CleanupReport, spawn_janitor};
pub use uploads::store_upload;

/// Bytes in one megabyte, as used for every size reported by this module.
pub const BYTES_PER_MB: f64 = 1_048_576.0;

// ── Disk usage ─────────────────────────────────────────────────────

/// Total size of every regular file under `path`, in bytes.
///
/// Symbolic links are neither followed nor counted. Unreadable entries and a
/// missing root are skipped, so a directory that does not exist reports 0.
pub fn directory_size_bytes(path: &Path) -> u64 {
    let mut total: u64 = 0;
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            total = total.saturating_add(metadata.len());
        }
    }
    total
}

/// Total size of every regular file under `path`, in megabytes.
pub fn directory_size_mb(path: &Path) -> f64 {
    directory_size_bytes(path) as f64 / BYTES_PER_MB
}

// ── Reaper ─────────────────────────────────────────────────────────

/// Outcome of a single reaping sweep over one directory.
#[derive(Debug, Default)]
pub struct ReapReport {
    /// Files that were removed.
    pub deleted: Vec<PathBuf>,
    /// One message per file that matched but could not be removed.
    pub errors: Vec<String>,
}

/// Delete regular files directly inside `dir` whose modification time is
/// strictly older than `max_age_hours` ago. Returns the number deleted.
///
/// Best-effort: a failure on one file is logged and the sweep continues.
/// A missing directory deletes nothing.
pub fn reap_older_than(dir: &Path, max_age_hours: u64) -> usize {
    let max_age = Duration::from_secs(max_age_hours.saturating_mul(60 * 60));
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    sweep_modified_before(dir, cutoff).deleted.len()
}

/// Delete regular files directly inside `dir` modified strictly before
/// `cutoff`, collecting per-file failures instead of stopping on them.
pub fn sweep_modified_before(dir: &Path, cutoff: SystemTime) -> ReapReport {
    sweep_modified_before_with(dir, cutoff, |path| std::fs::remove_file(path))
}

/// Same as [`sweep_modified_before`], with the deletion supplied by the
/// caller. `remove` is called once per stale regular file.
pub fn sweep_modified_before_with(
    dir: &Path,
    cutoff: SystemTime,
    mut remove: impl FnMut(&Path) -> std::io::Result<()>,
) -> ReapReport {
    let mut report = ReapReport::default();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Nothing to reap in {}: {e}", dir.display());
            return report;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        match reap_entry(&path, cutoff, &mut remove) {
            Ok(true) => {
                info!("Deleted old file: {}", path.display());
                report.deleted.push(path);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Error deleting file {}: {e}", path.display());
                report
                    .errors
                    .push(format!("failed to delete {}: {e}", path.display()));
            }
        }
    }

    report
}

/// Remove `path` through `remove` if it is a regular file older than `cutoff`.
fn reap_entry(
    path: &Path,
    cutoff: SystemTime,
    remove: &mut impl FnMut(&Path) -> std::io::Result<()>,
) -> std::io::Result<bool> {
    let metadata = std::fs::symlink_metadata(path)?;
    if !metadata.is_file() || metadata.modified()? >= cutoff {
        return Ok(false);
    }
    remove(path)?;
    Ok(true)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    /// Write `len` bytes to `path` and backdate its mtime by `age_hours`.
    pub fn write_aged(path: &Path, len: usize, age_hours: u64) {
        std::fs::write(path, vec![0u8; len]).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_hours * 60 * 60);
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(mtime).unwrap();
    }
}

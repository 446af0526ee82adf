//! Quota-triggered cleanup of the upload and edited-output directories.
//!
//! The policy is a threshold, not an eviction budget: nothing is deleted
//! until combined usage exceeds the ceiling, and then every file older than
//! [`CLEANUP_AGE_HOURS`] is removed from both directories regardless of how
//! much space that reclaims.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{directory_size_mb, reap_older_than};

/// Files older than this are eligible once the ceiling is crossed.
pub const CLEANUP_AGE_HOURS: u64 = 24;

/// Default storage ceiling in megabytes.
pub const DEFAULT_MAX_STORAGE_MB: f64 = 500.0;

/// Default interval between janitor runs.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// What a single [`CleanupPolicy::run`] observed and did.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupReport {
    /// Combined usage of both directories before any deletion.
    pub usage_before_mb: f64,
    /// Ceiling the usage was compared against.
    pub ceiling_mb: f64,
    /// Whether the ceiling was exceeded and the reaper ran.
    pub swept: bool,
    pub uploads_deleted: usize,
    pub edited_deleted: usize,
    /// Combined usage after the sweep. `None` when no sweep ran.
    pub usage_after_mb: Option<f64>,
}

/// Storage ceiling policy over the two tracked directories.
#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    /// Where user uploads are written.
    pub uploads_dir: PathBuf,
    /// Where edited images are written.
    pub edited_dir: PathBuf,
    /// Combined ceiling in megabytes. Default: `500`.
    pub max_storage_mb: f64,
}

impl CleanupPolicy {
    pub fn new(uploads_dir: impl Into<PathBuf>, edited_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            edited_dir: edited_dir.into(),
            max_storage_mb: DEFAULT_MAX_STORAGE_MB,
        }
    }

    /// Override the storage ceiling.
    pub fn with_max_storage_mb(mut self, max_storage_mb: f64) -> Self {
        self.max_storage_mb = max_storage_mb;
        self
    }

    /// Combined usage of both tracked directories, in megabytes.
    pub fn usage_mb(&self) -> f64 {
        directory_size_mb(&self.uploads_dir) + directory_size_mb(&self.edited_dir)
    }

    /// Check usage and reap both directories if the ceiling is exceeded.
    pub fn run(&self) -> CleanupReport {
        self.run_with(reap_older_than)
    }

    /// Same as [`run`](Self::run), with the reaper supplied by the caller.
    /// `reap` receives each directory and the age threshold in hours and
    /// returns how many files it deleted.
    pub fn run_with(&self, mut reap: impl FnMut(&Path, u64) -> usize) -> CleanupReport {
        info!("Running scheduled cleanup check...");

        for dir in [&self.uploads_dir, &self.edited_dir] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("Could not create {}: {e}", dir.display());
            }
        }

        let usage_before_mb = self.usage_mb();
        info!(
            "Current storage usage: {:.2} MB / {} MB",
            usage_before_mb, self.max_storage_mb
        );

        let mut report = CleanupReport {
            usage_before_mb,
            ceiling_mb: self.max_storage_mb,
            swept: false,
            uploads_deleted: 0,
            edited_deleted: 0,
            usage_after_mb: None,
        };

        if usage_before_mb <= self.max_storage_mb {
            info!("Storage usage is within limits. No cleanup needed.");
            return report;
        }

        info!(
            "Storage limit ({} MB) exceeded. Starting cleanup...",
            self.max_storage_mb
        );
        report.swept = true;
        report.uploads_deleted = reap(&self.uploads_dir, CLEANUP_AGE_HOURS);
        report.edited_deleted = reap(&self.edited_dir, CLEANUP_AGE_HOURS);
        info!(
            "Cleanup finished. Deleted {} uploaded files and {} edited images.",
            report.uploads_deleted, report.edited_deleted
        );

        let usage_after_mb = self.usage_mb();
        info!("New storage usage: {:.2} MB", usage_after_mb);
        report.usage_after_mb = Some(usage_after_mb);
        report
    }
}

/// Run `policy` every `every` on a Tokio task until the handle is aborted.
///
/// The first check happens one full interval after spawning. Each run is
/// moved to the blocking pool since it walks and deletes files.
///
/// Panics if `every` is zero.
pub fn spawn_janitor(policy: CleanupPolicy, every: Duration) -> JoinHandle<()> {
    let policy = Arc::new(policy);
    info!(
        "Scheduling background cleanup every {:.1} hour(s)",
        every.as_secs_f64() / 3600.0
    );
    tokio::spawn(async move {
        let mut tick = tokio::time::interval_at(Instant::now() + every, every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            let policy = policy.clone();
            match tokio::task::spawn_blocking(move || policy.run()).await {
                Ok(report) => debug!("Janitor run complete: {report:?}"),
                Err(e) => error!("Cleanup run aborted: {e}"),
            }
        }
    })
}

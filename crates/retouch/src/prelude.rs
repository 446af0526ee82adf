//! Convenience re-exports for the common `retouch` types.
//!
//! ```ignore
//! use retouch::prelude::*;
//! ```
//!
//! Wire-level types (Gemini request parts, Reddit listing structs) are left
//! out. Import those from their modules directly when needed.

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::AppConfig;

// ── Posts ───────────────────────────────────────────────────────────
pub use crate::posts::{Post, PostCache, PostResolver, PostSource, PostTier, mock_posts};

// ── AI ──────────────────────────────────────────────────────────────
pub use crate::ai::data_uri::save_data_uri;
pub use crate::ai::{EditResult, GeminiClient, ImageEditor, RequestAnalyzer};

// ── Storage ─────────────────────────────────────────────────────────
pub use crate::storage::{
    CleanupPolicy, CleanupReport, directory_size_mb, reap_older_than, spawn_janitor, store_upload,
};

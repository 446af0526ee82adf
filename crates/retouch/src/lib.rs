//! Backend glue for browsing r/PhotoshopRequest and editing images with a
//! generative vision model.
//!
//! `retouch` ties together three external collaborators (the Reddit API,
//! the Gemini `generateContent` REST API, and local file storage) plus a
//! background janitor that keeps the storage directories under a size
//! ceiling. Every top-level operation degrades instead of failing: post
//! lookups fall back from the live source to a cached snapshot to a fixed
//! mock dataset, and edit requests report problems as an
//! [`EditResult`](ai::edit::EditResult) with `ok: false`.
//!
//! # Getting started
//!
//! ```ignore
//! use retouch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let config = AppConfig::from_env();
//!
//!     // Live → cache → mock, never fails.
//!     let posts = config.build_resolver()?.resolve(10, false).await;
//!     let first = &posts[0];
//!
//!     // Turn the request text into an editing instruction.
//!     let instruction = config
//!         .build_analyzer()?
//!         .analyze(&first.title, &first.description)
//!         .await?;
//!
//!     // Send the image and the instruction to the vision model.
//!     let result = config.build_editor()?.edit(&first.image_url, &instruction).await;
//!     if let Some(uri) = &result.edited_image_data {
//!         let path = save_data_uri(&config.edited_dir, uri)?;
//!         println!("saved {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`posts`] | [`PostResolver`](posts::PostResolver) fallback chain, Reddit client, cache snapshot, mock data |
//! | [`ai`] | [`GeminiClient`](ai::GeminiClient), request analysis, the edit orchestrator, data-URI helpers |
//! | [`storage`] | Disk usage, age-based reaping, quota-triggered cleanup, recurring janitor, upload store |
//! | [`config`] | Environment-sourced [`AppConfig`](config::AppConfig) and component builders |

pub mod ai;
pub mod config;
pub mod posts;
pub mod prelude;
pub mod storage;

// ── Constants ──────────────────────────────────────────────────────

/// Default Gemini REST endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for turning request text into an editing instruction.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash-latest";

/// Image-capable model used for edits.
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Subreddit the live source reads from.
pub const DEFAULT_SUBREDDIT: &str = "PhotoshopRequest";

/// Browser identification sent when downloading source images. Some image
/// hosts reject non-browser agents outright.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

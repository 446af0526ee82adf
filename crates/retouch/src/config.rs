//! Environment-sourced configuration.
//!
//! [`AppConfig`] gathers every setting the backend reads from the process
//! environment and turns them into ready-to-use components via
//! [`build_resolver`](AppConfig::build_resolver),
//! [`build_analyzer`](AppConfig::build_analyzer),
//! [`build_editor`](AppConfig::build_editor) and
//! [`build_cleanup_policy`](AppConfig::build_cleanup_policy).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::ai::{GeminiClient, ImageEditor, RequestAnalyzer};
use crate::posts::cache::DEFAULT_CACHE_FILE;
use crate::posts::reddit::DEFAULT_USER_AGENT;
use crate::posts::{PostCache, PostResolver, RedditClient, RedditCredentials};
use crate::storage::CleanupPolicy;
use crate::storage::cleanup::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_STORAGE_MB};

/// Default directory for user uploads.
pub const DEFAULT_UPLOADS_DIR: &str = "static/uploads";

/// Default directory for saved edit results.
pub const DEFAULT_EDITED_DIR: &str = "static/edited_images";

/// Backend configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key. `None` leaves both AI components unconfigured.
    pub gemini_api_key: Option<String>,
    /// Model for request analysis. Default: `"gemini-1.5-flash-latest"`.
    pub text_model: String,
    /// Model for image edits. Default: `"gemini-2.5-flash-image-preview"`.
    pub vision_model: String,
    /// Gemini REST endpoint. Default: the public API.
    pub gemini_base_url: String,
    /// Script-app credentials. `None` unless all four values are set.
    pub reddit: Option<RedditCredentials>,
    /// Subreddit for the live tier. Default: `"PhotoshopRequest"`.
    pub subreddit: String,
    /// Storage ceiling in MB. Default: `500`.
    pub max_storage_mb: f64,
    /// How often the janitor runs. Default: one hour.
    pub cleanup_interval: Duration,
    pub uploads_dir: PathBuf,
    pub edited_dir: PathBuf,
    pub cache_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            text_model: crate::DEFAULT_TEXT_MODEL.to_string(),
            vision_model: crate::DEFAULT_VISION_MODEL.to_string(),
            gemini_base_url: crate::GEMINI_BASE_URL.to_string(),
            reddit: None,
            subreddit: crate::DEFAULT_SUBREDDIT.to_string(),
            max_storage_mb: DEFAULT_MAX_STORAGE_MB,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            edited_dir: PathBuf::from(DEFAULT_EDITED_DIR),
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let reddit = match (
            get("REDDIT_CLIENT_ID"),
            get("REDDIT_CLIENT_SECRET"),
            get("REDDIT_USERNAME"),
            get("REDDIT_PASSWORD"),
        ) {
            (Some(client_id), Some(client_secret), Some(username), Some(password)) => {
                Some(RedditCredentials {
                    client_id,
                    client_secret,
                    username,
                    password,
                    user_agent: get("REDDIT_USER_AGENT")
                        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                })
            }
            _ => None,
        };

        let interval_hours: f64 =
            parse_or("CLEANUP_INTERVAL_HOURS", get("CLEANUP_INTERVAL_HOURS"), 1.0);
        let cleanup_interval = match Duration::try_from_secs_f64(interval_hours * 3600.0) {
            Ok(every) if !every.is_zero() => every,
            _ => {
                warn!("CLEANUP_INTERVAL_HOURS must be positive, using the default");
                defaults.cleanup_interval
            }
        };

        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            text_model: get("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
            vision_model: get("GEMINI_VISION_MODEL").unwrap_or(defaults.vision_model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            reddit,
            subreddit: get("SUBREDDIT").unwrap_or(defaults.subreddit),
            max_storage_mb: parse_or(
                "MAX_STORAGE_MB",
                get("MAX_STORAGE_MB"),
                defaults.max_storage_mb,
            ),
            cleanup_interval,
            uploads_dir: get("RETOUCH_UPLOADS_DIR").map_or(defaults.uploads_dir, PathBuf::from),
            edited_dir: get("RETOUCH_EDITED_DIR").map_or(defaults.edited_dir, PathBuf::from),
            cache_file: get("RETOUCH_CACHE_FILE").map_or(defaults.cache_file, PathBuf::from),
        }
    }

    /// Whether the AI components have an API key.
    pub fn gemini_configured(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    fn gemini_client(&self) -> Result<Option<GeminiClient>, String> {
        self.gemini_api_key
            .as_ref()
            .map(|key| GeminiClient::with_base_url(key.clone(), self.gemini_base_url.clone()))
            .transpose()
    }

    /// Build the post resolver. The live tier is attached only when Reddit
    /// credentials are present.
    pub fn build_resolver(&self) -> Result<PostResolver, String> {
        let resolver = PostResolver::new(PostCache::new(self.cache_file.clone()));
        match &self.reddit {
            Some(credentials) => {
                let client = RedditClient::new(credentials.clone(), self.subreddit.clone())?;
                info!("Reddit API configured for r/{}", self.subreddit);
                Ok(resolver.with_source(client))
            }
            None => {
                warn!("Reddit credentials not found, live posts are disabled");
                Ok(resolver)
            }
        }
    }

    pub fn build_analyzer(&self) -> Result<RequestAnalyzer, String> {
        Ok(RequestAnalyzer::new(self.gemini_client()?, self.text_model.clone()))
    }

    pub fn build_editor(&self) -> Result<ImageEditor, String> {
        if !self.gemini_configured() {
            warn!("GEMINI_API_KEY not found, AI features are disabled");
        }
        ImageEditor::new(self.gemini_client()?, self.vision_model.clone())
    }

    pub fn build_cleanup_policy(&self) -> CleanupPolicy {
        CleanupPolicy::new(self.uploads_dir.clone(), self.edited_dir.clone())
            .with_max_storage_mb(self.max_storage_mb)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {key} value {raw:?}, using default {default}");
            default
        }),
    }
}

//! Editable-image posts and the fallback chain that produces them.
//!
//! [`PostResolver::resolve`] walks an ordered list of [`PostTier`]s and
//! returns the first non-empty answer:
//!
//! ```text
//! prefer_cache = false:  Live ──▶ Cache ──▶ Mock
//! prefer_cache = true:           Cache ──▶ Mock
//! ```
//!
//! A successful live fetch replaces the cache snapshot wholesale. Live
//! source errors are logged and never escape; the mock tier always answers.

pub mod cache;
pub mod mock;
pub mod reddit;

use std::time::Duration;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use cache::PostCache;
pub use mock::mock_posts;
pub use reddit::{PostSource, RedditClient, RedditCredentials, Submission};

/// Only submissions newer than this are offered from the live source.
pub const LIVE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// An image-editing request scraped from the forum.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "postUrl")]
    pub post_url: String,
    /// Submission time, epoch seconds.
    pub created_utc: f64,
    /// `created_utc` as an RFC 3339 UTC timestamp.
    pub created_date: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub subreddit: String,
}

impl Post {
    /// Build a post from a submission, or `None` if it has no usable image.
    pub fn from_submission(submission: Submission) -> Option<Self> {
        let image_url = submission.image_url()?;
        Some(Self {
            created_date: iso_date(submission.created_utc),
            post_url: format!("https://www.reddit.com{}", submission.permalink),
            author: submission
                .author
                .unwrap_or_else(|| "[deleted]".to_string()),
            id: submission.id,
            title: submission.title,
            description: submission.selftext,
            image_url,
            created_utc: submission.created_utc,
            score: submission.score,
            num_comments: submission.num_comments,
            subreddit: submission.subreddit,
        })
    }
}

/// Format epoch seconds as an RFC 3339 UTC timestamp (second precision).
pub fn iso_date(epoch_secs: f64) -> String {
    DateTime::from_timestamp(epoch_secs.trunc() as i64, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Keep submissions created at or after `now_secs - max_age` that carry an
/// image, in source order.
pub fn qualifying_posts(submissions: Vec<Submission>, now_secs: f64, max_age: Duration) -> Vec<Post> {
    let cutoff = now_secs - max_age.as_secs_f64();
    submissions
        .into_iter()
        .filter(|s| s.created_utc >= cutoff)
        .filter_map(Post::from_submission)
        .collect()
}

// ── Resolver ───────────────────────────────────────────────────────

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostTier {
    /// The live post source.
    Live,
    /// The persisted snapshot of the last successful live fetch.
    Cache,
    /// The fixed demonstration dataset.
    Mock,
}

impl std::fmt::Display for PostTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostTier::Live => write!(f, "live"),
            PostTier::Cache => write!(f, "cache"),
            PostTier::Mock => write!(f, "mock"),
        }
    }
}

/// Resolves posts through the live → cache → mock chain.
pub struct PostResolver {
    source: Option<Box<dyn PostSource>>,
    cache: PostCache,
    max_age: Duration,
}

impl PostResolver {
    /// A resolver with no live source; only cache and mock tiers answer
    /// until [`with_source`](Self::with_source) is called.
    pub fn new(cache: PostCache) -> Self {
        Self {
            source: None,
            cache,
            max_age: LIVE_MAX_AGE,
        }
    }

    /// Attach the live post source.
    pub fn with_source(mut self, source: impl PostSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether a live source is attached.
    pub fn is_live_configured(&self) -> bool {
        self.source.is_some()
    }

    pub fn cache(&self) -> &PostCache {
        &self.cache
    }

    /// The tiers tried, in order, for a given mode.
    pub fn tiers(prefer_cache: bool) -> &'static [PostTier] {
        if prefer_cache {
            &[PostTier::Cache, PostTier::Mock]
        } else {
            &[PostTier::Live, PostTier::Cache, PostTier::Mock]
        }
    }

    /// Return posts from the first tier that has any. Never fails.
    pub async fn resolve(&self, limit: u32, prefer_cache: bool) -> Vec<Post> {
        self.resolve_tiered(limit, prefer_cache).await.1
    }

    /// Like [`resolve`](Self::resolve), also reporting which tier answered.
    pub async fn resolve_tiered(&self, limit: u32, prefer_cache: bool) -> (PostTier, Vec<Post>) {
        for &tier in Self::tiers(prefer_cache) {
            let posts = self.try_tier(tier, limit).await;
            if !posts.is_empty() {
                info!("Serving {} posts from {tier} tier", posts.len());
                return (tier, posts);
            }
        }
        // Unreachable in practice: the mock tier is never empty.
        (PostTier::Mock, mock_posts())
    }

    async fn try_tier(&self, tier: PostTier, limit: u32) -> Vec<Post> {
        match tier {
            PostTier::Live => match self.fetch_live(limit).await {
                Ok(posts) => posts,
                Err(e) => {
                    warn!("Failed to fetch live posts: {e}. Falling back to cache.");
                    Vec::new()
                }
            },
            PostTier::Cache => self.cache.load(),
            PostTier::Mock => {
                info!("Generating mock data as live source and cache are unavailable.");
                mock_posts()
            }
        }
    }

    /// Fetch, filter, and on a non-empty result persist the live posts.
    async fn fetch_live(&self, limit: u32) -> Result<Vec<Post>, String> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| "live source not configured".to_string())?;

        info!("Attempting to fetch fresh posts from live source...");
        let submissions = source.fetch_new(limit).await?;
        let fetched = submissions.len();
        let now = chrono::Utc::now().timestamp() as f64;
        let posts = qualifying_posts(submissions, now, self.max_age);
        info!("{} of {fetched} submissions qualified", posts.len());

        if posts.is_empty() {
            info!("No new image posts found on the live source.");
            return Ok(posts);
        }

        if let Err(e) = self.cache.store(&posts) {
            warn!("Could not update post cache: {e}");
        }
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::reddit::{FetchFuture, Preview, PreviewImage, PreviewSource};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        result: Result<Vec<Submission>, String>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn new(result: Result<Vec<Submission>, String>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    result,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl PostSource for FakeSource {
        fn fetch_new(&self, _limit: u32) -> FetchFuture<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    fn now() -> f64 {
        chrono::Utc::now().timestamp() as f64
    }

    fn image_submission(id: &str, age_secs: f64) -> Submission {
        Submission {
            id: id.into(),
            title: format!("title {id}"),
            created_utc: now() - age_secs,
            permalink: format!("/r/PhotoshopRequest/comments/{id}/x/"),
            author: Some("poster".into()),
            subreddit: "PhotoshopRequest".into(),
            url: Some(format!("https://i.redd.it/{id}.jpg")),
            ..Default::default()
        }
    }

    fn cached_post(id: &str) -> Post {
        Post {
            id: id.into(),
            title: "cached".into(),
            description: String::new(),
            image_url: "https://i.redd.it/cached.png".into(),
            post_url: "https://www.reddit.com/r/x".into(),
            created_utc: 1_700_000_000.0,
            created_date: iso_date(1_700_000_000.0),
            author: "someone".into(),
            score: 1,
            num_comments: 0,
            subreddit: "PhotoshopRequest".into(),
        }
    }

    fn mock_ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn tier_order() {
        assert_eq!(
            PostResolver::tiers(false),
            &[PostTier::Live, PostTier::Cache, PostTier::Mock]
        );
        assert_eq!(PostResolver::tiers(true), &[PostTier::Cache, PostTier::Mock]);
    }

    #[test]
    fn iso_date_formats_utc() {
        assert_eq!(iso_date(0.0), "1970-01-01T00:00:00Z");
        assert_eq!(iso_date(1_700_000_000.5), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn from_submission_maps_fields() {
        let s = Submission {
            author: None,
            ..image_submission("abc", 10.0)
        };
        let post = Post::from_submission(s).unwrap();
        assert_eq!(post.author, "[deleted]");
        assert_eq!(
            post.post_url,
            "https://www.reddit.com/r/PhotoshopRequest/comments/abc/x/"
        );
        assert_eq!(post.image_url, "https://i.redd.it/abc.jpg");
    }

    #[test]
    fn qualifying_drops_stale_and_imageless() {
        let text_only = Submission {
            url: Some("https://www.reddit.com/r/x/comments/t".into()),
            ..image_submission("text", 60.0)
        };
        let preview_only = Submission {
            url: None,
            preview: Some(Preview {
                images: vec![PreviewImage {
                    source: PreviewSource {
                        url: "https://preview.redd.it/p.jpg?a=1&amp;b=2".into(),
                    },
                }],
            }),
            ..image_submission("prev", 60.0)
        };
        let submissions = vec![
            image_submission("a", 60.0),
            image_submission("stale", 25.0 * 3600.0),
            text_only,
            preview_only,
            image_submission("b", 3600.0),
        ];

        let posts = qualifying_posts(submissions, now(), LIVE_MAX_AGE);
        assert_eq!(mock_ids(&posts), ["a", "prev", "b"]);
        assert_eq!(posts[1].image_url, "https://preview.redd.it/p.jpg?a=1&b=2");
    }

    #[tokio::test]
    async fn prefer_cache_with_empty_cache_returns_mock() {
        let dir = tempfile::tempdir().unwrap();
        let (source, calls) = FakeSource::new(Ok(vec![image_submission("live", 10.0)]));
        let resolver =
            PostResolver::new(PostCache::new(dir.path().join("posts.json"))).with_source(source);

        let (tier, posts) = resolver.resolve_tiered(10, true).await;
        assert_eq!(tier, PostTier::Mock);
        assert_eq!(
            mock_ids(&posts),
            ["mock_post_1", "mock_post_2", "mock_post_3"]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn prefer_cache_returns_snapshot_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PostCache::new(dir.path().join("posts.json"));
        let cached = vec![cached_post("c1"), cached_post("c2")];
        cache.store(&cached).unwrap();

        let resolver = PostResolver::new(cache);
        assert_eq!(resolver.resolve(10, true).await, cached);
    }

    #[tokio::test]
    async fn live_failure_falls_back_to_cache_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PostCache::new(dir.path().join("posts.json"));
        let cached = vec![cached_post("c1")];
        cache.store(&cached).unwrap();
        let before = std::fs::read_to_string(cache.path()).unwrap();

        let (source, calls) = FakeSource::new(Err("request failed: connection refused".into()));
        let resolver = PostResolver::new(cache).with_source(source);

        let (tier, posts) = resolver.resolve_tiered(10, false).await;
        assert_eq!(tier, PostTier::Cache);
        assert_eq!(posts, cached);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read_to_string(resolver.cache().path()).unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn live_failure_without_cache_returns_mock() {
        let dir = tempfile::tempdir().unwrap();
        let (source, _) = FakeSource::new(Err("boom".into()));
        let resolver =
            PostResolver::new(PostCache::new(dir.path().join("posts.json"))).with_source(source);

        let (tier, posts) = resolver.resolve_tiered(10, false).await;
        assert_eq!(tier, PostTier::Mock);
        assert_eq!(posts.len(), 3);
    }

    #[tokio::test]
    async fn unconfigured_live_source_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PostResolver::new(PostCache::new(dir.path().join("posts.json")));
        assert!(!resolver.is_live_configured());

        let (tier, _) = resolver.resolve_tiered(10, false).await;
        assert_eq!(tier, PostTier::Mock);
    }

    #[tokio::test]
    async fn live_success_overwrites_cache_in_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PostCache::new(dir.path().join("posts.json"));
        cache.store(&[cached_post("old")]).unwrap();

        let (source, _) = FakeSource::new(Ok(vec![
            image_submission("z", 30.0),
            image_submission("a", 20.0),
            image_submission("m", 10.0),
        ]));
        let resolver = PostResolver::new(cache).with_source(source);

        let (tier, posts) = resolver.resolve_tiered(10, false).await;
        assert_eq!(tier, PostTier::Live);
        assert_eq!(mock_ids(&posts), ["z", "a", "m"]);
        assert_eq!(resolver.cache().load(), posts);
    }

    #[tokio::test]
    async fn live_with_no_qualifying_posts_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PostCache::new(dir.path().join("posts.json"));
        let cached = vec![cached_post("c1")];
        cache.store(&cached).unwrap();

        let (source, _) = FakeSource::new(Ok(vec![image_submission("stale", 2.0 * 86_400.0)]));
        let resolver = PostResolver::new(cache).with_source(source);

        let (tier, posts) = resolver.resolve_tiered(10, false).await;
        assert_eq!(tier, PostTier::Cache);
        assert_eq!(posts, cached);
        assert_eq!(resolver.cache().load(), cached);
    }
}

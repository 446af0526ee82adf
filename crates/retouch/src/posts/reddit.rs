//! Live post source backed by the Reddit OAuth API.
//!
//! [`PostSource`] is the seam the resolver depends on; [`RedditClient`] is
//! the production implementation. It authenticates with the password grant
//! (script apps), caches the bearer token until shortly before expiry, and
//! reads `/r/<subreddit>/new`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, trace};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const REDDIT_API_URL: &str = "https://oauth.reddit.com";

/// Default user agent when `REDDIT_USER_AGENT` is unset. Reddit throttles
/// generic agents aggressively.
pub const DEFAULT_USER_AGENT: &str = "retouch/0.1 (photoshop request browser)";

/// Refresh the token this long before Reddit says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Boxed future returned by [`PostSource::fetch_new`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Submission>, String>> + Send + 'a>>;

/// A source of recent submissions, newest first.
pub trait PostSource: Send + Sync {
    /// Fetch up to `limit` of the newest submissions.
    fn fetch_new(&self, limit: u32) -> FetchFuture<'_>;
}

// ── Wire types ─────────────────────────────────────────────────────

/// A submission as returned in a Reddit listing.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Submission {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub preview: Option<Preview>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Preview {
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PreviewImage {
    pub source: PreviewSource,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PreviewSource {
    pub url: String,
}

impl Submission {
    /// The image to edit: the submission URL when it points straight at a
    /// JPEG/PNG, otherwise the first preview image. `None` for text posts.
    pub fn image_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref()
            && has_image_extension(url)
        {
            return Some(url.to_string());
        }
        self.preview
            .as_ref()?
            .images
            .first()
            .map(|img| img.source.url.replace("&amp;", "&"))
    }
}

fn has_image_extension(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    [".jpg", ".jpeg", ".png"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

#[derive(Deserialize, Debug)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize, Debug)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize, Debug)]
struct ListingChild {
    data: Submission,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    error: Option<String>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Script-app credentials for the password grant.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Async client for one subreddit's `new` listing.
pub struct RedditClient {
    client: reqwest::Client,
    credentials: RedditCredentials,
    subreddit: String,
    auth_url: String,
    api_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials, subreddit: impl Into<String>) -> Result<Self, String> {
        Self::with_endpoints(credentials, subreddit, REDDIT_AUTH_URL, REDDIT_API_URL)
    }

    /// Create a client against custom token and API endpoints.
    pub fn with_endpoints(
        credentials: RedditCredentials,
        subreddit: impl Into<String>,
        auth_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            credentials,
            subreddit: subreddit.into(),
            auth_url: auth_url.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock().ok()?;
        guard
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.value.clone())
    }

    fn set_token(&self, token: Option<CachedToken>) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = token;
        }
    }

    /// Return a valid bearer token, requesting a new one if needed.
    async fn access_token(&self) -> Result<String, String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!("Requesting Reddit access token");
        let resp = self
            .client
            .post(&self.auth_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read token response: {e}"))?;
        if !status.is_success() {
            return Err(format!("Reddit auth HTTP {status}: {text}"));
        }

        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| format!("failed to parse token response: {e}"))?;
        if let Some(err) = parsed.error {
            return Err(format!("Reddit auth error: {err}"));
        }
        let value = parsed
            .access_token
            .ok_or_else(|| "Reddit auth response had no access_token".to_string())?;

        let lifetime = Duration::from_secs(parsed.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        self.set_token(Some(CachedToken {
            value: value.clone(),
            expires_at,
        }));
        Ok(value)
    }

    /// Fetch up to `limit` of the newest submissions in the subreddit.
    pub async fn new_submissions(&self, limit: u32) -> Result<Vec<Submission>, String> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/r/{}/new?limit={limit}&raw_json=1",
            self.api_url, self.subreddit
        );
        debug!("Fetching r/{} new (limit={limit})", self.subreddit);

        let start = Instant::now();
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            "Reddit response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.set_token(None);
            }
            return Err(format!("Reddit API HTTP {status}: {text}"));
        }

        let listing: Listing =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse listing: {e}"))?;
        let submissions: Vec<Submission> =
            listing.data.children.into_iter().map(|c| c.data).collect();
        trace!("Listing contained {} submissions", submissions.len());
        Ok(submissions)
    }
}

impl PostSource for RedditClient {
    fn fetch_new(&self, limit: u32) -> FetchFuture<'_> {
        Box::pin(self.new_submissions(limit))
    }
}

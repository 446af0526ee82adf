//! Generative-AI layer: the Gemini REST client and the two operations built
//! on it.
//!
//! - [`GeminiClient`]: thin async client for `models/<model>:generateContent`.
//! - [`analyze`]: turns a request's title/body into a terse edit instruction.
//! - [`edit`]: the edit orchestrator (load image, validate, send, decode).
//! - [`data_uri`]: `data:<mime>;base64,...` encoding and result persistence.

pub mod analyze;
pub mod data_uri;
pub mod edit;

use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use analyze::RequestAnalyzer;
pub use edit::{EditResult, ImageEditor};

// ── Request types ──────────────────────────────────────────────────

/// `generateContent` request body.
#[derive(Serialize, Debug, Default)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// A single-turn text prompt.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: None,
        }
    }

    /// A prompt plus one inline image, asking for image output.
    pub fn with_image(prompt: impl Into<String>, mime_type: &str, image: &[u8]) -> Self {
        Self {
            contents: vec![Content::user(vec![
                Part::text(prompt),
                Part::inline(mime_type, image),
            ])],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".into(), "IMAGE".into()]),
            }),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct GenerationConfig {
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
}

/// One turn of content. Used both in requests and in candidates.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".into()),
            parts,
        }
    }
}

/// A content part: text, inline binary data, or (rarely) both absent.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        rename = "inline_data",
        alias = "inlineData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(bytes),
            }),
        }
    }
}

/// Base64 payload with its MIME type.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InlineData {
    #[serde(rename = "mime_type", alias = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

impl InlineData {
    /// Decode the base64 payload.
    pub fn bytes(&self) -> Result<Vec<u8>, String> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| format!("invalid inline data: {e}"))
    }
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawGenerateResponse {
    candidates: Option<Vec<RawCandidate>>,
    error: Option<ApiErrorResponse>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
struct RawCandidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    pub prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    pub candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    pub total_token_count: Option<u32>,
}

/// Clean return type from [`GeminiClient::generate`]: the parts of the
/// first candidate, flattened.
#[derive(Debug, Default)]
pub struct Generation {
    pub parts: Vec<Part>,
    pub finish_reason: Option<String>,
    /// Set when the prompt itself was blocked and no candidate was produced.
    pub block_reason: Option<String>,
    pub usage: Option<UsageMetadata>,
}

impl Generation {
    /// All text parts joined, or `None` if the model returned no text.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(""))
        }
    }

    /// The first part carrying inline data.
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.parts.iter().find_map(|p| p.inline_data.as_ref())
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client against the public Gemini endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_base_url(api_key, crate::GEMINI_BASE_URL)
    }

    /// Create a client against a custom endpoint (proxies, tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("retouch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Send a `generateContent` request to `model`.
    pub async fn generate(&self, model: &str, body: &GenerateRequest) -> Result<Generation, String> {
        let part_count: usize = body.contents.iter().map(|c| c.parts.len()).sum();
        debug!("Gemini request: model={model}, parts={part_count}");

        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "Gemini response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("Gemini API HTTP {status}: {text}"));
        }

        let parsed: RawGenerateResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;

        if let Some(err) = parsed.error {
            return Err(format!("Gemini API error: {}", err.message));
        }

        if let Some(ref usage) = parsed.usage_metadata {
            trace!(
                "Token usage: prompt={}, candidates={}, total={}",
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
                usage.total_token_count.unwrap_or(0),
            );
        }

        let block_reason = parsed.prompt_feedback.and_then(|f| f.block_reason);
        let candidate = parsed.candidates.and_then(|c| c.into_iter().next());

        Ok(match candidate {
            Some(c) => Generation {
                parts: c.content.map(|c| c.parts).unwrap_or_default(),
                finish_reason: c.finish_reason,
                block_reason,
                usage: parsed.usage_metadata,
            },
            None => {
                debug!("Gemini output: no candidates (block_reason={block_reason:?})");
                Generation {
                    block_reason,
                    usage: parsed.usage_metadata,
                    ..Default::default()
                }
            }
        })
    }
}

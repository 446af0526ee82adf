//! Edit request orchestration.
//!
//! [`ImageEditor::edit`] resolves the source image (remote URL or local
//! path), checks that it decodes, sends it to the vision model with a fixed
//! instruction template, and turns the reply into an [`EditResult`]. Every
//! failure along the way becomes `ok: false` with a message; nothing is
//! returned as an `Err`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::data_uri::{self, sniff_mime_type};
use super::{GeminiClient, GenerateRequest};

/// Timeout for downloading the source image.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Message used when the model replies without an image.
pub const NO_IMAGE_MESSAGE: &str = "AI did not return an image. It may have refused the \
request due to safety policies or a vague prompt.";

/// Outcome of one edit request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditResult {
    pub ok: bool,
    /// The edited image as a `data:<mime>;base64,...` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditResult {
    pub fn success(data_uri: impl Into<String>) -> Self {
        Self {
            ok: true,
            edited_image_data: Some(data_uri.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            edited_image_data: None,
            error: Some(error.into()),
        }
    }
}

/// The instruction template sent alongside the image.
pub fn edit_prompt(instruction: &str) -> String {
    format!(
        "**Role**: You are an expert photo editing AI.\n\
         **Task**: Follow the user's instructions precisely to edit the provided image.\n\
         **Constraint**: Your response MUST be ONLY the edited image. Do not provide any \
         text, descriptions, or commentary.\n\n\
         **User's Instruction**: \"{instruction}\""
    )
}

/// Whether `source` is an absolute `http`/`https` URL.
pub fn is_remote(source: &str) -> bool {
    reqwest::Url::parse(source)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Sends images and instructions to the vision model.
pub struct ImageEditor {
    client: Option<GeminiClient>,
    model: String,
    downloader: reqwest::Client,
}

impl ImageEditor {
    /// Create an editor. `client = None` yields an editor that reports
    /// "not configured" for every request.
    pub fn new(client: Option<GeminiClient>, model: impl Into<String>) -> Result<Self, String> {
        let downloader = reqwest::Client::builder()
            .user_agent(crate::BROWSER_USER_AGENT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            model: model.into(),
            downloader,
        })
    }

    /// Whether a vision model is available.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Edit the image at `image_source` according to `instruction`.
    pub async fn edit(&self, image_source: &str, instruction: &str) -> EditResult {
        let Some(client) = &self.client else {
            return EditResult::failure("AI model not configured.");
        };

        let bytes = match self.load_image(image_source).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not load image from {image_source}: {e}");
                return EditResult::failure(e);
            }
        };

        let mime_type = match validate_image(&bytes) {
            Ok(mime) => mime,
            Err(e) => return EditResult::failure(e),
        };

        info!("Sending request to Gemini vision model {}...", self.model);
        let request = GenerateRequest::with_image(edit_prompt(instruction), mime_type, &bytes);
        let generation = match client.generate(&self.model, &request).await {
            Ok(g) => g,
            Err(e) => {
                warn!("Image editing request failed: {e}");
                return EditResult::failure(format!("Image editing request failed: {e}"));
            }
        };

        if let Some(inline) = generation.first_inline_data() {
            return match inline.bytes() {
                Ok(edited) => {
                    info!(
                        "Received edited image from Gemini ({}, {} bytes)",
                        inline.mime_type,
                        edited.len()
                    );
                    EditResult::success(data_uri::encode(&inline.mime_type, &edited))
                }
                Err(e) => EditResult::failure(format!("AI returned unreadable image data: {e}")),
            };
        }

        let mut message = NO_IMAGE_MESSAGE.to_string();
        let reason = generation.text().or(generation.block_reason);
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            message.push_str(&format!("\nReason from AI: {reason}"));
        }
        warn!(
            "{message} (finish_reason={})",
            generation.finish_reason.as_deref().unwrap_or("none")
        );
        EditResult::failure(message)
    }

    /// Read the source image: download remote URLs, read anything else as
    /// a local path.
    pub async fn load_image(&self, source: &str) -> Result<Vec<u8>, String> {
        let bytes = if is_remote(source) {
            info!("Downloading image from URL: {source}");
            self.download(source)
                .await
                .map_err(|e| format!("Failed to download image from URL: {e}"))?
        } else {
            info!("Loading image from local path: {source}");
            read_local(Path::new(source)).await?
        };

        if bytes.is_empty() {
            return Err("Could not load image data from source.".to_string());
        }
        Ok(bytes)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, String> {
        let resp = self
            .downloader
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {status} for {url}"));
        }
        let bytes = resp.bytes().await.map_err(|e| e.to_string())?;
        debug!("Downloaded {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, String> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            format!("Image file not found at path: {}", path.display())
        } else {
            format!("Failed to read image file {}: {e}", path.display())
        }
    })
}

/// Check that `bytes` decode as an image and return its MIME type.
fn validate_image(bytes: &[u8]) -> Result<&'static str, String> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| format!("The provided source is not a valid image: {e}"))?;
    debug!(
        "Image loaded successfully: {}x{}",
        decoded.width(),
        decoded.height()
    );
    sniff_mime_type(bytes).ok_or_else(|| "Unsupported image format.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::data_uri::test_support::{encoded, png_bytes};
    use image::ImageFormat;

    fn offline_editor() -> ImageEditor {
        // Port 9 (discard) is never contacted by these tests.
        let client = GeminiClient::with_base_url("test-key", "http://127.0.0.1:9").unwrap();
        ImageEditor::new(Some(client), "test-model").unwrap()
    }

    #[test]
    fn result_serialization_omits_absent_fields() {
        let ok = serde_json::to_value(EditResult::success("data:image/png;base64,AA==")).unwrap();
        assert_eq!(ok["ok"], true);
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(EditResult::failure("nope")).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"], "nope");
        assert!(err.get("edited_image_data").is_none());
    }

    #[test]
    fn prompt_embeds_instruction_and_forbids_text() {
        let prompt = edit_prompt("make the sky purple");
        assert!(prompt.contains("\"make the sky purple\""));
        assert!(prompt.contains("MUST be ONLY the edited image"));
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://i.redd.it/a.jpg"));
        assert!(is_remote("http://localhost:8080/a.png"));
        assert!(!is_remote("static/uploads/a.png"));
        assert!(!is_remote("/static/uploads/a.png"));
        assert!(!is_remote("ftp://example.com/a.png"));
    }

    #[tokio::test]
    async fn unconfigured_editor_reports_it() {
        let editor = ImageEditor::new(None, "m").unwrap();
        assert!(!editor.is_configured());
        let result = editor.edit("whatever.png", "anything").await;
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("AI model not configured."));
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");
        let result = offline_editor()
            .edit(path.to_str().unwrap(), "brighten")
            .await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn non_image_local_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"definitely not pixels").unwrap();

        let result = offline_editor()
            .edit(path.to_str().unwrap(), "brighten")
            .await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("not a valid image"));
    }

    #[tokio::test]
    async fn empty_local_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let err = offline_editor()
            .load_image(path.to_str().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, "Could not load image data from source.");
    }

    #[tokio::test]
    async fn local_png_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.png");
        std::fs::write(&path, png_bytes()).unwrap();

        let bytes = offline_editor()
            .load_image(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(validate_image(&bytes).unwrap(), "image/png");
    }

    #[tokio::test]
    async fn local_bmp_and_tiff_load() {
        let dir = tempfile::tempdir().unwrap();
        for (name, format, mime) in [
            ("scan.bmp", ImageFormat::Bmp, "image/bmp"),
            ("scan.tiff", ImageFormat::Tiff, "image/tiff"),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, encoded(format)).unwrap();

            let bytes = offline_editor()
                .load_image(path.to_str().unwrap())
                .await
                .unwrap();
            assert_eq!(validate_image(&bytes).unwrap(), mime);
        }
    }
}

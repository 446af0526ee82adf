//! Turns a request post into a concise editing instruction.

use tracing::{debug, warn};

use super::{GeminiClient, GenerateRequest};

/// Builds the one-shot prompt for [`RequestAnalyzer::analyze`].
pub fn analysis_prompt(title: &str, body: &str) -> String {
    let body = if body.trim().is_empty() {
        "No additional details provided."
    } else {
        body
    };
    format!(
        "Analyze the following user request for an image edit. Your task is to create a \
concise, one-paragraph instruction for an AI image editor.
Focus only on the technical editing requirements. Do not add any conversational fluff, \
greetings, or sign-offs.

Examples:
- \"Remove the person in the background and enhance the colors.\"
- \"Change the color of the red car to a metallic blue.\"
- \"Restore this old, scratched photograph, fixing the cracks and improving the contrast.\"

Post Title: \"{title}\"
Post Body: \"{body}\"

AI Editing Prompt:"
    )
}

/// One-shot text-model wrapper. No retries: a failure is reported once.
pub struct RequestAnalyzer {
    client: Option<GeminiClient>,
    model: String,
}

impl RequestAnalyzer {
    pub fn new(client: Option<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Whether a text model is available.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Produce an editing instruction from a post's title and body.
    pub async fn analyze(&self, title: &str, body: &str) -> Result<String, String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| "AI model not configured. Please set GEMINI_API_KEY.".to_string())?;

        let request = GenerateRequest::text(analysis_prompt(title, body));
        let generation = client
            .generate(&self.model, &request)
            .await
            .map_err(|e| {
                warn!("Error during Gemini text analysis: {e}");
                format!("Error analyzing request: {e}")
            })?;

        let text = generation
            .text()
            .ok_or_else(|| "Error analyzing request: model returned no text".to_string())?;
        let analysis = text.trim().replace('"', "");
        debug!("Analysis: {analysis}");
        Ok(analysis)
    }
}

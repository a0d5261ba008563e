use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::config::Config;
use crate::error::TransportError;

/// Sends one prompt to a generative model and returns its raw text.
///
/// One call per invocation: no retries and no timeout of our own.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String, TransportError>;
}

// Structures matching Gemini's models/{model}:generateContent endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    // Bare JSON, no markdown fences.
    response_mime_type: &'static str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated.
    fn into_text(self) -> Result<String, TransportError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(TransportError::NoCandidates { block_reason });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            // A candidate with no text usually means it was cut off by a safety filter.
            return Err(TransportError::NoCandidates {
                block_reason: block_reason.or(candidate.finish_reason),
            });
        }
        Ok(text)
    }
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    async fn send(&self, prompt: &str) -> Result<String, TransportError> {
        let url = self.endpoint();
        let request_payload = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        debug!(%url, model = %self.model, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_payload)
            .send()
            .await
            .map_err(TransportError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Gemini API request failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(TransportError::Decode)?;

        let text = match envelope.into_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Gemini API returned no usable candidate");
                return Err(e);
            }
        };

        debug!(reply_len = text.len(), "Received Gemini response");
        Ok(text)
    }
}

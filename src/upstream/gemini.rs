#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Upstream, UpstreamError};
use crate::config::UpstreamSettings;

/// Provider name used in logs and errors.
const PROVIDER: &str = "gemini";

/// Public Gemini API host.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Request body for `generateContent`.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    /// Conversation turns; the relay sends exactly one
    contents: Vec<Content<'a>>,
}

/// One turn of the request.
#[derive(Serialize)]
struct Content<'a> {
    /// Text parts of the turn
    parts: Vec<Part<'a>>,
}

/// A text part of a request turn.
#[derive(Serialize)]
struct Part<'a> {
    /// Prompt text
    text: &'a str,
}

/// Response body of `generateContent`.
#[derive(Deserialize, Default)]
struct GenerateResponse {
    /// Candidate completions; absent when the prompt was blocked
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// A single candidate completion.
#[derive(Deserialize, Default)]
struct Candidate {
    /// Generated content; absent when generation stopped early
    #[serde(default)]
    content: Option<CandidateContent>,
}

/// Content of a candidate.
#[derive(Deserialize, Default)]
struct CandidateContent {
    /// Generated parts
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

/// A generated part.
#[derive(Deserialize, Default)]
struct CandidatePart {
    /// Generated text, if this part is text
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenates the text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Calls Gemini's `models/{model}:generateContent` with the prompt as a single
/// text part.
pub struct GeminiUpstream {
    /// Shared HTTP client
    http:     reqwest::Client,
    /// Full `generateContent` URL for the configured model
    endpoint: String,
    /// API key, sent as `x-goog-api-key`
    api_key:  String,
    /// Model identifier
    model:    String,
}

impl GeminiUpstream {
    /// Builds a client from settings, reusing the shared HTTP client.
    pub fn new(settings: &UpstreamSettings, http: reqwest::Client) -> Self {
        let base = settings
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        let endpoint = format!("{base}/v1beta/models/{}:generateContent", settings.model);

        Self {
            http,
            endpoint,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        }
    }
}

#[async_trait]
impl Upstream for GeminiUpstream {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>, UpstreamError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                provider: PROVIDER,
                message:  e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| UpstreamError::Transport {
            provider: PROVIDER,
            message:  e.to_string(),
        })?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| UpstreamError::Decode {
                provider: PROVIDER,
                message:  format!("{e}. Full response: {text}"),
            })?;

        Ok(parsed.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Pass AI "},{"text":"Feedback: ok"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).expect("decode");
        assert_eq!(parsed.into_text().as_deref(), Some("Pass AI Feedback: ok"));
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).expect("decode");
        assert!(parsed.into_text().is_none());
    }
}

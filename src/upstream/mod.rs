#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Clients for the text-generation APIs the relay forwards prompts to.

use async_trait::async_trait;

/// OpenAI chat completions client
pub mod openai;
/// Google Gemini `generateContent` client
pub mod gemini;

pub use gemini::GeminiUpstream;
pub use openai::OpenAiUpstream;

/// A failed call to the text-generation API.
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    /// The request could not be sent or the connection failed.
    #[error("request to {provider} failed: {message}")]
    Transport {
        /// Provider name
        provider: &'static str,
        /// Error text from the HTTP client
        message:  String,
    },
    /// The API answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        /// Provider name
        provider: &'static str,
        /// HTTP status code
        status:   u16,
        /// Response body, as returned
        body:     String,
    },
    /// The API answered but the body could not be decoded.
    #[error("could not decode {provider} response: {message}")]
    Decode {
        /// Provider name
        provider: &'static str,
        /// Decoder error text
        message:  String,
    },
    /// The provider's client library reported an error.
    #[error("{provider} API error: {message}")]
    Api {
        /// Provider name
        provider: &'static str,
        /// Error text from the client library
        message:  String,
    },
}

/// One completion call against a text-generation API.
///
/// Implementations make exactly one attempt. `Ok(None)` means the API answered
/// but produced no text.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Short provider name for logs.
    fn provider(&self) -> &'static str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Sends `prompt` and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<Option<String>, UpstreamError>;
}

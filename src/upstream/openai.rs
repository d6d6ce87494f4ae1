#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;

use super::{Upstream, UpstreamError};
use crate::config::UpstreamSettings;

/// Provider name used in logs and errors.
const PROVIDER: &str = "openai";

/// Sends prompts as a single user message to an OpenAI-compatible chat
/// completions endpoint.
pub struct OpenAiUpstream {
    /// async-openai client with retries disabled
    client:      OpenAIClient<OpenAIConfig>,
    /// Model identifier
    model:       String,
    /// Optional temperature override
    temperature: Option<f32>,
    /// Optional top-p override
    top_p:       Option<f32>,
}

impl OpenAiUpstream {
    /// Builds a client from settings, reusing the shared HTTP client.
    pub fn new(settings: &UpstreamSettings, http_client: reqwest::Client) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(settings.api_key.clone());
        if let Some(base) = &settings.api_base {
            config = config.with_api_base(base.clone());
        }

        // async-openai retries rate-limited calls by default; one attempt only.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        let client = OpenAIClient::with_config(config)
            .with_http_client(http_client)
            .with_backoff(no_retry);

        Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            top_p: settings.top_p,
        }
    }
}

/// Maps client library errors onto the relay's upstream error kinds.
fn map_error(err: OpenAIError) -> UpstreamError {
    match err {
        OpenAIError::Reqwest(e) => UpstreamError::Transport {
            provider: PROVIDER,
            message:  e.to_string(),
        },
        OpenAIError::JSONDeserialize(e) => UpstreamError::Decode {
            provider: PROVIDER,
            message:  e.to_string(),
        },
        OpenAIError::ApiError(e) => UpstreamError::Api {
            provider: PROVIDER,
            message:  e.message,
        },
        other => UpstreamError::Api {
            provider: PROVIDER,
            message:  other.to_string(),
        },
    }
}

#[async_trait]
impl Upstream for OpenAiUpstream {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>, UpstreamError> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(map_error)?
            .into();

        let response = self
            .client
            .chat()
            .create(CreateChatCompletionRequest {
                model: self.model.clone(),
                messages: vec![message],
                temperature: self.temperature,
                top_p: self.top_p,
                n: Some(1),
                stream: Some(false),
                ..Default::default()
            })
            .await
            .map_err(map_error)?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The grading relay: prompt in, verdict out.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::time::{Instant, timeout};
use tracing::Instrument;

use crate::{
    config::{Provider, ServiceConfig},
    error::GradeError,
    payload::{GradeResult, PayloadSchema, SubmissionPayload},
    prompt::{self, TemplateProvider},
    upstream::{GeminiUpstream, OpenAiUpstream, Upstream},
    verdict,
};

/// Relays one submission at a time to the upstream model.
///
/// Holds no per-request state; share it behind an `Arc`.
#[derive(Clone)]
pub struct Grader {
    /// Text-generation API client
    upstream:      Arc<dyn Upstream>,
    /// Prompt renderer
    template:      Arc<dyn TemplateProvider>,
    /// Request schema enforced before any outbound call
    schema:        PayloadSchema,
    /// Whether feedback text is trimmed
    trim_feedback: bool,
    /// Deadline for the outbound call
    timeout:       Duration,
}

impl Grader {
    /// Assembles a grader from its collaborators.
    pub fn new(
        upstream: Arc<dyn Upstream>,
        template: Arc<dyn TemplateProvider>,
        schema: PayloadSchema,
        trim_feedback: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            template,
            schema,
            trim_feedback,
            timeout,
        }
    }

    /// Builds the grader described by `config`: loads the template and
    /// constructs the provider client.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let template = config
            .prompt_template()
            .context("Could not load the prompt template")?;

        let http_client = reqwest::Client::builder()
            .timeout(config.upstream.timeout)
            .build()
            .context("Failed to construct shared HTTP client")?;

        let upstream: Arc<dyn Upstream> = match config.upstream.provider {
            Provider::OpenAi => Arc::new(OpenAiUpstream::new(&config.upstream, http_client)),
            Provider::Gemini => Arc::new(GeminiUpstream::new(&config.upstream, http_client)),
        };

        Ok(Self::new(
            upstream,
            Arc::new(template),
            config.schema,
            config.trim_feedback,
            config.upstream.timeout,
        ))
    }

    /// Schema request bodies are validated against.
    pub fn schema(&self) -> &PayloadSchema {
        &self.schema
    }

    /// The upstream client.
    pub fn upstream(&self) -> &dyn Upstream {
        self.upstream.as_ref()
    }

    /// Grades one validated submission.
    pub async fn grade(&self, payload: SubmissionPayload) -> Result<GradeResult, GradeError> {
        let span = tracing::info_span!(
            "grade",
            student = %payload.id,
            task = payload.task.as_deref().unwrap_or("-"),
            files = payload.source_files.len(),
        );

        async move {
            let prompt = prompt::render_for(self.template.as_ref(), &payload)?;

            let started = Instant::now();
            let reply = timeout(self.timeout, self.upstream.complete(&prompt))
                .await
                .map_err(|_| GradeError::UpstreamTimeout(self.timeout))??;
            tracing::info!(
                provider = self.upstream.provider(),
                model = self.upstream.model(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "upstream replied"
            );

            let verdict = verdict::parse_reply(reply.as_deref(), self.trim_feedback)?;
            tracing::info!(status = %verdict.status, "graded submission");

            Ok::<_, GradeError>(GradeResult {
                student_id: payload.id,
                task:       payload.task,
                status:     verdict.status.to_string(),
                feedback:   verdict.feedback,
            })
        }
        .instrument(span)
        .await
    }
}

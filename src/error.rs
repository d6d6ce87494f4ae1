#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{prompt::TemplateError, upstream::UpstreamError, verdict::ReplyError};

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Message shown to the caller
    pub detail: String,
}

/// Every way a grading request can fail.
///
/// Only [`GradeError::InvalidPayload`] carries caller-facing detail; every
/// other kind answers with a fixed message and is logged in full instead.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// The request body is missing fields or is not valid JSON.
    #[error("invalid payload: {detail}")]
    InvalidPayload {
        /// 4xx status to answer with
        status: StatusCode,
        /// What was wrong with the body
        detail: String,
    },
    /// The upstream call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// The upstream call did not finish in time.
    #[error("upstream call timed out after {0:?}")]
    UpstreamTimeout(std::time::Duration),
    /// The upstream answered with something that is not a verdict.
    #[error("malformed upstream response: {0}")]
    MalformedReply(#[from] ReplyError),
    /// The prompt could not be rendered.
    #[error("could not render prompt: {0}")]
    Template(#[from] TemplateError),
}

impl GradeError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GradeError::InvalidPayload { status, .. } => *status,
            GradeError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GradeError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GradeError::MalformedReply(_) | GradeError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the caller.
    pub fn public_detail(&self) -> String {
        match self {
            GradeError::InvalidPayload { detail, .. } => detail.clone(),
            GradeError::Upstream(_) => "Upstream model request failed.".into(),
            GradeError::UpstreamTimeout(_) => "Upstream model request timed out.".into(),
            GradeError::MalformedReply(_) => "Malformed upstream response.".into(),
            GradeError::Template(_) => "Internal server error.".into(),
        }
    }
}

impl IntoResponse for GradeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "grading request failed");
        } else {
            tracing::warn!(error = %self, "rejected grading request");
        }

        (status, Json(ErrorBody { detail: self.public_detail() })).into_response()
    }
}

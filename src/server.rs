#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! HTTP surface of the relay.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    config::ServiceConfig,
    error::GradeError,
    grader::Grader,
    payload::{GradeResult, MissingField, RawPayload},
};

impl From<JsonRejection> for GradeError {
    fn from(rejection: JsonRejection) -> Self {
        GradeError::InvalidPayload {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<MissingField> for GradeError {
    fn from(missing: MissingField) -> Self {
        GradeError::InvalidPayload {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: missing.to_string(),
        }
    }
}

/// Static facts reported by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Always `ok` while the process serves requests
    pub status:   &'static str,
    /// Active preset
    pub variant:  String,
    /// Upstream provider name
    pub provider: String,
    /// Upstream model
    pub model:    String,
}

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    /// The relay
    grader: Arc<Grader>,
    /// Pre-built health response
    health: Arc<HealthReport>,
}

/// Builds the router with the grading endpoint mounted at `route`.
pub fn router(grader: Grader, route: &str, variant: &str) -> Router {
    let health = HealthReport {
        status:   "ok",
        variant:  variant.to_string(),
        provider: grader.upstream().provider().to_string(),
        model:    grader.upstream().model().to_string(),
    };
    let state = AppState {
        grader: Arc::new(grader),
        health: Arc::new(health),
    };

    Router::new()
        .route(route, post(grade))
        .route("/health", get(health_check))
        .with_state(state)
}

/// `POST <route>`: validates the body, relays it, returns the verdict.
async fn grade(
    State(state): State<AppState>,
    body: Result<Json<RawPayload>, JsonRejection>,
) -> Result<Json<GradeResult>, GradeError> {
    let Json(raw) = body?;
    let payload = raw.validate(state.grader.schema())?;
    let result = state.grader.grade(payload).await?;
    Ok(Json(result))
}

/// `GET /health`
async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.as_ref().clone())
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let grader = Grader::from_config(&config)?;
    let app = router(grader, &config.route, config.variant.name());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Could not bind {addr}"))?;

    tracing::info!(
        %addr,
        route = %config.route,
        variant = %config.variant,
        provider = %config.upstream.provider,
        model = %config.upstream.model,
        id_field = %config.schema.id_field,
        require_task = config.schema.require_task,
        trim_feedback = config.trim_feedback,
        timeout_secs = config.upstream.timeout.as_secs(),
        "grading relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("Server crashed")
}

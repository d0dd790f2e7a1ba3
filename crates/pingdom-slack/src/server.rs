//! HTTP server for Pingdom webhooks.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::warn;

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Largest webhook body accepted.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const BANNER: &str = "pingdom-slack: Pingdom alerts to Slack webhook!";

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> reqwest::Result<Self> {
        let pipeline = Pipeline::new(&config)?;
        Ok(Self { config, pipeline })
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/monitoring/health", get(health_check))
        .route("/", post(missing_channel))
        .route("/{channel}", post(pingdom_webhook_handler).get(banner))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health response: one flag per required secret.
#[derive(Debug, Serialize)]
struct HealthResponse {
    slack_webhook: bool,
    pingdom_token: bool,
    version: &'static str,
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = HealthResponse {
        slack_webhook: state.config.slack_webhook().is_some(),
        pingdom_token: state.config.pingdom_token().is_some(),
        version: env!("CARGO_PKG_VERSION"),
    };

    let status = if health.slack_webhook && health.pingdom_token {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(health))
}

async fn banner() -> &'static str {
    BANNER
}

async fn missing_channel() -> impl IntoResponse {
    warn!("Webhook posted without a channel");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "NOK", "error": "missing channel in request path" })),
    )
}

/// Handle a Pingdom webhook posted to `/{channel}`.
///
/// The body is taken raw so that a malformed payload still produces a
/// Slack message instead of a rejection.
async fn pingdom_webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(channel): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    if channel.trim().is_empty() {
        return missing_channel().await.into_response();
    }

    let response = state.pipeline.run(&channel, &body).await;
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(response)).into_response()
}

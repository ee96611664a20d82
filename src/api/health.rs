//! Health and status endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Service capability response
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub gemini_configured: bool,
    pub tts_available: bool,
    /// Model that answered last, tried first on the next call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_model: Option<String>,
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Report which backends are configured
async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let preferred_model = match &state.assistant {
        Some(assistant) => assistant.cache().last_success().await,
        None => None,
    };

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        gemini_configured: state.assistant.is_some(),
        tts_available: state.tts.is_some(),
        preferred_model,
    })
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build status router (needs state)
pub fn status_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .with_state(state)
}

//! Image question answering endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::vision::{EncodedImage, FailureKind};

/// Asked when the request carries no question
const DEFAULT_QUESTION: &str = "What is in this image?";

/// Room for the question, field names and a `data:` URL prefix
const ENVELOPE_BYTES: usize = 64 * 1024;

/// Build analyze router
pub fn router(state: Arc<ApiState>) -> Router {
    let limit = body_limit(state.max_image_bytes);
    Router::new()
        .route("/api/analyze", post(analyze).layer(DefaultBodyLimit::max(limit)))
        .with_state(state)
}

/// Request body bound for an image of at most `max_image_bytes` raw bytes
///
/// Oversized images must reach the handler so they are rejected with 400.
const fn body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes.div_ceil(3).saturating_mul(4).saturating_add(ENVELOPE_BYTES)
}

/// Analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Question about the image; defaults to a general description
    #[serde(default)]
    pub question: Option<String>,
    /// Base64 JPEG; the latest camera frame is used when absent
    #[serde(default)]
    pub image: Option<String>,
}

/// Analyze response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: String,
    pub speakable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// Answer a question about an image
///
/// Upstream failures still return 200 with a suppressed reply so the UI can
/// display the message without speaking it.
async fn analyze(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AnalyzeError> {
    let assistant = state
        .assistant
        .as_ref()
        .ok_or(AnalyzeError::NotConfigured("Gemini API key not configured"))?;

    let question = match request.question {
        Some(q) if q.trim().is_empty() => return Err(AnalyzeError::BadRequest("Empty question".to_string())),
        Some(q) => q,
        None => DEFAULT_QUESTION.to_string(),
    };

    let image = match request.image {
        Some(encoded) => EncodedImage::from_base64(&encoded, state.max_image_bytes)
            .map_err(|e| AnalyzeError::BadRequest(e.to_string()))?,
        None => load_frame(&state).await?,
    };

    let reply = assistant.ask(&image, &question).await;
    tracing::info!(
        speakable = reply.is_speakable(),
        model = reply.model.as_deref().unwrap_or("-"),
        "analyze request answered"
    );

    Ok(Json(AnalyzeResponse {
        speakable: reply.is_speakable(),
        result: reply.text,
        model: reply.model,
        failure: reply.failure,
    }))
}

/// Read the latest frame written by the capture process
async fn load_frame(state: &ApiState) -> Result<EncodedImage, AnalyzeError> {
    let path = state
        .frame_path
        .as_ref()
        .ok_or_else(|| AnalyzeError::BadRequest("No image provided".to_string()))?;

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "failed to read camera frame");
        AnalyzeError::FrameUnavailable
    })?;

    EncodedImage::from_jpeg(&bytes, state.max_image_bytes)
        .map_err(|e| AnalyzeError::BadRequest(e.to_string()))
}

/// Analyze API errors
#[derive(Debug)]
pub enum AnalyzeError {
    NotConfigured(&'static str),
    BadRequest(String),
    FrameUnavailable,
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::FrameUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "frame_unavailable",
                "Could not capture camera frame".to_string(),
            ),
        };

        super::error_response(status, code, message)
    }
}

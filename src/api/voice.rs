//! Voice API endpoint for text-to-speech

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;

use super::ApiState;
use crate::Error;
use crate::vision::sanitize;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/synthesize", post(synthesize))
        .with_state(state)
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
}

/// Synthesize text to speech
///
/// Returns audio in MP3 format
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, VoiceError> {
    let tts = state
        .tts
        .as_ref()
        .ok_or(VoiceError::NotConfigured("TTS not configured (no ElevenLabs key)"))?;

    if request.text.trim().is_empty() {
        return Err(VoiceError::BadRequest("Empty text"));
    }

    // Checked here as well so a refusal maps to 422 rather than a synthesis failure
    let (_, disposition) = sanitize::sanitize(&request.text);
    if !disposition.is_speakable() {
        return Err(VoiceError::NotSpeakable);
    }

    let audio = tts.synthesize(&request.text).await.map_err(|e| match e {
        Error::Tts(msg) => VoiceError::SynthesisFailed(msg),
        other => VoiceError::SynthesisFailed(other.to_string()),
    })?;

    if audio.is_empty() {
        return Err(VoiceError::SynthesisFailed("Generated audio is empty".to_string()));
    }

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    NotConfigured(&'static str),
    BadRequest(&'static str),
    NotSpeakable,
    SynthesisFailed(String),
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::NotSpeakable => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "not_speakable",
                "Text is an error or status message and will not be spoken".to_string(),
            ),
            Self::SynthesisFailed(msg) => {
                tracing::warn!(error = %msg, "speech synthesis failed");
                (StatusCode::BAD_GATEWAY, "synthesis_failed", msg)
            }
        };

        super::error_response(status, code, message)
    }
}

//! HTTP API server for the web UI

pub mod analyze;
pub mod health;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::vision::{DEFAULT_MAX_IMAGE_BYTES, VisionAssistant};
use crate::voice::SpeechSynthesizer;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Vision pipeline; `None` when no Gemini key is configured
    pub assistant: Option<Arc<VisionAssistant>>,
    /// Speech synthesis; `None` when voice is disabled or unkeyed
    pub tts: Option<Arc<SpeechSynthesizer>>,
    /// Latest camera frame, used when a request carries no image
    pub frame_path: Option<PathBuf>,
    /// Largest accepted frame, in raw bytes
    pub max_image_bytes: usize,
}

impl Default for ApiState {
    fn default() -> Self {
        Self {
            assistant: None,
            tts: None,
            frame_path: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Render the `{error: {code, message}}` body shared by every endpoint
pub(crate) fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    #[derive(Serialize)]
    struct ErrorResponse {
        error: ErrorBody,
    }

    #[derive(Serialize)]
    struct ErrorBody {
        code: &'static str,
        message: String,
    }

    (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    state: ApiState,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            state: ApiState::default(),
            port,
            static_dir: None,
        }
    }

    /// Set the vision assistant
    #[must_use]
    pub fn assistant(mut self, assistant: Arc<VisionAssistant>) -> Self {
        self.state.assistant = Some(assistant);
        self
    }

    /// Set the speech synthesizer
    #[must_use]
    pub fn tts(mut self, tts: Arc<SpeechSynthesizer>) -> Self {
        self.state.tts = Some(tts);
        self
    }

    /// Set the camera frame file
    #[must_use]
    pub fn frame_path(mut self, path: Option<PathBuf>) -> Self {
        self.state.frame_path = path;
        self
    }

    /// Set the image size limit
    #[must_use]
    pub const fn max_image_bytes(mut self, max: usize) -> Self {
        self.state.max_image_bytes = max;
        self
    }

    /// Set static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        ApiServer {
            state: Arc::new(self.state),
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(analyze::router(self.state.clone()))
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(health::router())
            .merge(health::status_router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.assistant.is_none() {
            tracing::warn!("no Gemini API key configured, /api/analyze will be unavailable");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

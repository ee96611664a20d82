//! Seam between the dispatcher and the inference service

use async_trait::async_trait;

use super::gemini::GenerateRequest;
use crate::Result;

/// Transport-level failure of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The per-attempt timeout elapsed
    Timeout,
    /// The service could not be reached
    Connect(String),
    /// Any other failure before a status line was received
    Other(String),
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect(msg) => write!(f, "connection error: {msg}"),
            Self::Other(msg) => write!(f, "network error: {msg}"),
        }
    }
}

/// Raw outcome of one attempt, before classification
#[derive(Debug, Clone)]
pub enum AttemptResult {
    /// No HTTP response was received
    Transport(TransportFailure),
    /// An HTTP response with its parsed JSON body, if the body was JSON
    Http {
        status: u16,
        body: Option<serde_json::Value>,
    },
}

impl AttemptResult {
    /// Shorthand for an HTTP response with a JSON body
    #[must_use]
    pub fn http(status: u16, body: serde_json::Value) -> Self {
        Self::Http {
            status,
            body: Some(body),
        }
    }
}

/// A model advertised by the capability-list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Model identifier without the `models/` prefix
    pub name: String,
    /// Supported generation methods (e.g. `generateContent`)
    pub methods: Vec<String>,
}

impl CatalogEntry {
    /// Whether the model can serve `generateContent`
    #[must_use]
    pub fn supports_generate(&self) -> bool {
        self.methods.iter().any(|m| m == "generateContent")
    }
}

/// Issues requests against the inference service
///
/// Implementations never fail a `generate` call: every outcome, including
/// timeouts, is reported as an [`AttemptResult`] for the classifier.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Send one single-turn request to `model` under `version`
    async fn generate(&self, version: &str, model: &str, request: &GenerateRequest)
    -> AttemptResult;

    /// Fetch the capability list
    ///
    /// # Errors
    ///
    /// Returns error if the list cannot be fetched or parsed
    async fn list_models(&self) -> Result<Vec<CatalogEntry>>;
}

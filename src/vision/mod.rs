//! Vision question answering
//!
//! Turns a captured frame plus a spoken question into a short answer by
//! cascading through candidate models and API versions until one answers,
//! then decides whether the answer may be spoken aloud.
//!
//! ```text
//! question + frame
//!        │
//!        ▼
//!  catalog::resolve_candidates ──► dispatch::Dispatcher ──► sanitize
//!        ▲                               │  classify per attempt
//!        └──────── SessionCache ◄────────┘  (record success)
//! ```

pub mod catalog;
pub mod classify;
pub mod dispatch;
pub mod gemini;
mod image;
pub mod sanitize;
pub mod transport;

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

pub use catalog::{CatalogPolicy, ModelCandidate, Origin, SessionCache, Tier};
pub use classify::{AbortKind, ClassifiedOutcome};
pub use dispatch::{DEFAULT_API_VERSIONS, DispatchOutcome, DispatchReport, Dispatcher};
pub use gemini::{GeminiTransport, GenerateRequest, GenerationConfig};
pub use image::{DEFAULT_MAX_IMAGE_BYTES, EncodedImage};
pub use sanitize::Disposition;
pub use transport::{AttemptResult, CatalogEntry, InferenceTransport, TransportFailure};

/// Shown when the quota or billing limit was hit
pub const QUOTA_MESSAGE: &str =
    "Error: Quota exceeded. Please check your Google Cloud billing or wait for quota reset.";

/// Shown when the API key was rejected
pub const AUTH_MESSAGE: &str = "Error: API key error. Please check your Gemini API key.";

/// Shown when no candidate produced an answer
pub const EXHAUSTED_MESSAGE: &str = "Error: I couldn't analyze that image.";

/// Why a call produced no answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Quota,
    Auth,
    Exhausted,
}

impl FailureKind {
    /// User-facing message; never contains upstream error text
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Quota => QUOTA_MESSAGE,
            Self::Auth => AUTH_MESSAGE,
            Self::Exhausted => EXHAUSTED_MESSAGE,
        }
    }
}

impl From<AbortKind> for FailureKind {
    fn from(kind: AbortKind) -> Self {
        match kind {
            AbortKind::Quota => Self::Quota,
            AbortKind::Auth => Self::Auth,
        }
    }
}

/// Final result of a question, always displayable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Normalized text
    pub text: String,
    /// Whether the text may be spoken
    pub disposition: Disposition,
    /// Model that answered, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Why there is no answer, if there is none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Reply {
    /// Sanitize an answer from `model`
    #[must_use]
    pub fn answered(model: String, text: &str) -> Self {
        let (text, disposition) = sanitize::sanitize(text);
        Self {
            text,
            disposition,
            model: Some(model),
            failure: None,
        }
    }

    /// Build the user-facing reply for a failure
    #[must_use]
    pub fn failed(kind: FailureKind) -> Self {
        let (text, disposition) = sanitize::sanitize(kind.message());
        Self {
            text,
            disposition,
            model: None,
            failure: Some(kind),
        }
    }

    /// Whether the reply may be handed to speech synthesis
    #[must_use]
    pub fn is_speakable(&self) -> bool {
        self.disposition.is_speakable()
    }
}

/// Wrap a user question in the accessibility prompt
#[must_use]
pub fn build_prompt(question: &str) -> String {
    format!(
        "You are helping a visually impaired person identify visual objects. \
         Answer their question about what they can see in this image with one \
         clear, simple sentence. Be direct and helpful. Question: {}",
        question.trim()
    )
}

/// Orchestrates catalog resolution, dispatch and sanitization
///
/// Cheap to share behind an `Arc`; the session cache is internal and guarded.
pub struct VisionAssistant {
    transport: Arc<dyn InferenceTransport>,
    cache: SessionCache,
    policy: CatalogPolicy,
    api_versions: Vec<String>,
    generation: GenerationConfig,
}

impl VisionAssistant {
    /// Create an assistant with default policy, versions and sampling
    #[must_use]
    pub fn new(transport: Arc<dyn InferenceTransport>) -> Self {
        Self {
            transport,
            cache: SessionCache::new(),
            policy: CatalogPolicy::default(),
            api_versions: DEFAULT_API_VERSIONS.iter().map(ToString::to_string).collect(),
            generation: GenerationConfig::default(),
        }
    }

    /// Override the catalog policy
    #[must_use]
    pub fn with_policy(mut self, policy: CatalogPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the API versions tried per candidate
    #[must_use]
    pub fn with_api_versions(mut self, versions: Vec<String>) -> Self {
        self.api_versions = versions;
        self
    }

    /// Override the sampling parameters
    #[must_use]
    pub const fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Session state shared by every call on this assistant
    #[must_use]
    pub const fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Candidates the next call would try, in order
    pub async fn models(&self) -> Vec<ModelCandidate> {
        catalog::resolve_candidates(&self.policy, &self.cache, self.transport.as_ref()).await
    }

    /// Run the cascade and return the raw dispatch report
    pub async fn dispatch(&self, image: &EncodedImage, question: &str) -> DispatchReport {
        let prompt = build_prompt(question);
        let request = GenerateRequest::single_turn(&prompt, image, self.generation);
        let candidates = self.models().await;

        Dispatcher::new(self.transport.as_ref(), &self.cache)
            .dispatch(&request, &candidates, &self.api_versions)
            .await
    }

    /// Answer a question about an image
    ///
    /// Never fails: quota, auth and exhaustion come back as suppressed replies.
    pub async fn ask(&self, image: &EncodedImage, question: &str) -> Reply {
        let call_id = uuid::Uuid::new_v4();
        let report = self
            .dispatch(image, question)
            .instrument(tracing::info_span!("ask", %call_id))
            .await;
        tracing::debug!(%call_id, issued = report.issued(), "dispatch finished");

        match report.outcome {
            DispatchOutcome::Succeeded { model, text } => Reply::answered(model, &text),
            DispatchOutcome::Aborted(kind) => Reply::failed(kind.into()),
            DispatchOutcome::Exhausted => Reply::failed(FailureKind::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_are_suppressed() {
        for kind in [FailureKind::Quota, FailureKind::Auth, FailureKind::Exhausted] {
            let reply = Reply::failed(kind);
            assert!(!reply.is_speakable(), "{kind:?}");
            assert_eq!(reply.failure, Some(kind));
            assert_eq!(reply.text, kind.message());
        }
    }

    #[test]
    fn test_answer_is_normalized() {
        let reply = Reply::answered("m".to_string(), " a red mug ");
        assert_eq!(reply.text, "a red mug.");
        assert!(reply.is_speakable());
        assert_eq!(reply.model.as_deref(), Some("m"));
    }

    #[test]
    fn test_prompt_embeds_question() {
        let prompt = build_prompt("  what color is the cup? ");
        assert!(prompt.starts_with("You are helping a visually impaired person"));
        assert!(prompt.ends_with("Question: what color is the cup?"));
    }
}

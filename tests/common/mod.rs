//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use hatseye::vision::{
    AttemptResult, CatalogEntry, CatalogPolicy, EncodedImage, GenerateRequest,
    InferenceTransport,
};
use serde_json::json;

/// Smallest JPEG-shaped payload (SOI + EOI markers)
pub const TINY_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

/// In-memory transport replaying scripted responses in order
///
/// Once the script runs out every attempt answers 404.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<AttemptResult>>,
    calls: Mutex<Vec<(String, String)>>,
    catalog: Result<Vec<CatalogEntry>, String>,
    catalog_fetches: AtomicUsize,
}

impl ScriptedTransport {
    /// Transport whose capability list fails
    pub fn new(script: Vec<AttemptResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            catalog: Err("catalog offline".to_string()),
            catalog_fetches: AtomicUsize::new(0),
        }
    }

    /// Serve these models (all supporting `generateContent`) from the capability list
    #[must_use]
    pub fn with_catalog(mut self, models: &[&str]) -> Self {
        self.catalog = Ok(models
            .iter()
            .map(|m| CatalogEntry {
                name: (*m).to_string(),
                methods: vec!["generateContent".to_string()],
            })
            .collect());
        self
    }

    /// Queue more responses
    pub fn push(&self, results: impl IntoIterator<Item = AttemptResult>) {
        self.script.lock().unwrap().extend(results);
    }

    /// `(model, version)` of every attempt, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn catalog_fetches(&self) -> usize {
        self.catalog_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceTransport for ScriptedTransport {
    async fn generate(&self, version: &str, model: &str, request: &GenerateRequest) -> AttemptResult {
        assert_eq!(request.message_count(), 1, "request must carry exactly one message");
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), version.to_string()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| not_found())
    }

    async fn list_models(&self) -> hatseye::Result<Vec<CatalogEntry>> {
        self.catalog_fetches.fetch_add(1, Ordering::SeqCst);
        self.catalog
            .clone()
            .map_err(hatseye::Error::Catalog)
    }
}

/// 200 response carrying a normal answer
pub fn answer(text: &str) -> AttemptResult {
    AttemptResult::http(
        200,
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        }),
    )
}

/// Error response with a Gemini-style error body
pub fn error(status: u16, message: &str) -> AttemptResult {
    AttemptResult::http(status, json!({"error": {"code": status, "message": message}}))
}

pub fn not_found() -> AttemptResult {
    error(404, "models/x is not found for API version v1beta")
}

/// Static candidates only, so attempt order is fully predictable
pub fn static_policy() -> CatalogPolicy {
    CatalogPolicy {
        dynamic_catalog: false,
        ..CatalogPolicy::default()
    }
}

pub fn image() -> EncodedImage {
    EncodedImage::from_jpeg(TINY_JPEG, 1024).unwrap()
}

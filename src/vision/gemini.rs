//! Gemini `generateContent` wire types and HTTP transport

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::image::EncodedImage;
use super::transport::{AttemptResult, CatalogEntry, InferenceTransport, TransportFailure};
use crate::{Error, Result};

/// Default Gemini API host
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Lower is more deterministic
    pub temperature: f32,
    /// Upper bound on answer length
    pub max_output_tokens: u32,
    /// Nucleus-sampling breadth
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 50,
            top_p: 0.8,
        }
    }
}

/// A single-turn `generateContent` request body
///
/// `contents` is a one-element array: no history is ever carried between
/// calls, and the type makes a second message unrepresentable.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    contents: [Content; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Image { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

impl GenerateRequest {
    /// Build a request holding exactly one user message: prompt text plus the inlined image
    #[must_use]
    pub fn single_turn(prompt: &str, image: &EncodedImage, config: GenerationConfig) -> Self {
        Self {
            contents: [Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: image.mime_type(),
                            data: image.data().to_string(),
                        },
                    },
                ],
            }],
            generation_config: config,
        }
    }

    /// Number of messages in the payload (always one)
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.contents.len()
    }
}

/// Capability-list response
#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelListEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// `reqwest` implementation of [`InferenceTransport`] for the Gemini REST API
pub struct GeminiTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    request_timeout: Duration,
    catalog_timeout: Duration,
    catalog_version: String,
}

impl GeminiTransport {
    /// Create a transport against the public Gemini endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Gemini API key required for vision".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            request_timeout: Duration::from_secs(15),
            catalog_timeout: Duration::from_secs(10),
            catalog_version: "v1beta".to_string(),
        })
    }

    /// Override the API host (trailing slashes are ignored)
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the per-attempt and catalog timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, request: Duration, catalog: Duration) -> Self {
        self.request_timeout = request;
        self.catalog_timeout = catalog;
        self
    }

    fn generate_url(&self, version: &str, model: &str) -> String {
        format!("{}/{version}/models/{model}:generateContent", self.base_url)
    }
}

/// Map a `reqwest` error to a transport failure; the URL carries the key and is dropped
fn transport_failure(e: reqwest::Error) -> TransportFailure {
    let e = e.without_url();
    if e.is_timeout() {
        TransportFailure::Timeout
    } else if e.is_connect() {
        TransportFailure::Connect(e.to_string())
    } else {
        TransportFailure::Other(e.to_string())
    }
}

#[async_trait]
impl InferenceTransport for GeminiTransport {
    async fn generate(
        &self,
        version: &str,
        model: &str,
        request: &GenerateRequest,
    ) -> AttemptResult {
        let response = match self
            .client
            .post(self.generate_url(version, model))
            .query(&[("key", self.api_key.expose_secret())])
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return AttemptResult::Transport(transport_failure(e)),
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(bytes) => AttemptResult::Http {
                status,
                body: serde_json::from_slice(&bytes).ok(),
            },
            Err(e) => AttemptResult::Transport(transport_failure(e)),
        }
    }

    async fn list_models(&self) -> Result<Vec<CatalogEntry>> {
        let url = format!("{}/{}/models", self.base_url, self.catalog_version);

        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.expose_secret())])
            .timeout(self.catalog_timeout)
            .send()
            .await
            .map_err(|e| Error::Catalog(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Catalog(format!("listing models returned {status}")));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| Error::Catalog(format!("parse error: {}", e.without_url())))?;

        Ok(list
            .models
            .into_iter()
            .map(|m| CatalogEntry {
                name: m.name.strip_prefix("models/").unwrap_or(&m.name).to_string(),
                methods: m.supported_generation_methods,
            })
            .collect())
    }
}

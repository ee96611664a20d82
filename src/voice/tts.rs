//! Text-to-speech (TTS) via ElevenLabs
//!
//! Only speakable replies ever reach the network; suppressed text is
//! refused before a request is built.

use secrecy::{ExposeSecret, SecretString};

use crate::vision::{Reply, sanitize};
use crate::{Error, Result};

/// Default ElevenLabs API host
pub const DEFAULT_TTS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Lowest-latency streaming mode
const OPTIMIZE_STREAMING_LATENCY: u8 = 4;

/// Synthesizes speech from reply text
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    voice_id: String,
    model: String,
    base_url: String,
}

impl SpeechSynthesizer {
    /// Create a synthesizer for the given voice and model
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, voice_id: String, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id,
            model,
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
        })
    }

    /// Point the synthesizer at a different host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Voice ID used for synthesis
    #[must_use]
    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    /// Speak a reply
    ///
    /// Returns `Ok(None)` for suppressed replies without contacting the service.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn speak(&self, reply: &Reply) -> Result<Option<Vec<u8>>> {
        if !reply.is_speakable() {
            tracing::debug!("reply suppressed, skipping speech");
            return Ok(None);
        }
        self.synthesize(&reply.text).await.map(Some)
    }

    /// Synthesize text to MP3 audio
    ///
    /// # Errors
    ///
    /// Returns `Error::Tts` if the text is not speakable or the service fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let (text, disposition) = sanitize::sanitize(text);
        if !disposition.is_speakable() {
            return Err(Error::Tts("refusing to speak suppressed text".to_string()));
        }

        let request = ElevenLabsRequest {
            text: &text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(self.url())
            .query(&[("optimize_streaming_latency", OPTIMIZE_STREAMING_LATENCY)])
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), voice = %self.voice_id, "speech synthesized");
        Ok(audio.to_vec())
    }

    fn url(&self) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

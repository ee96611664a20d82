//! Configuration management for HatsEye
//!
//! Precedence is env > toml > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::vision::{
    CatalogPolicy, DEFAULT_API_VERSIONS, DEFAULT_MAX_IMAGE_BYTES, GenerationConfig,
    gemini::DEFAULT_BASE_URL,
};
use file::HatsEyeConfigFile;

/// Default ElevenLabs voice (clear, natural voice suited to accessibility)
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// Default ElevenLabs model (lowest latency)
pub const DEFAULT_TTS_MODEL: &str = "eleven_turbo_v2_5";

/// Default HTTP API port
pub const DEFAULT_PORT: u16 = 5000;

/// HatsEye configuration
#[derive(Debug)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// Inference service configuration
    pub inference: InferenceConfig,

    /// Model ranking policy
    pub catalog: CatalogPolicy,

    /// Speech output configuration
    pub voice: VoiceConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Latest-frame JPEG written by the capture process
    pub frame_path: Option<PathBuf>,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Gemini API key (required for vision)
    pub gemini: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

/// Inference service configuration
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// API host
    pub base_url: String,

    /// Versions tried for each model, primary first
    pub api_versions: Vec<String>,

    /// Timeout for each `generateContent` attempt
    pub request_timeout: Duration,

    /// Timeout for the capability-list fetch
    pub catalog_timeout: Duration,

    /// Sampling parameters
    pub generation: GenerationConfig,

    /// Largest accepted frame, in raw bytes
    pub max_image_bytes: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_versions: DEFAULT_API_VERSIONS.iter().map(ToString::to_string).collect(),
            request_timeout: Duration::from_secs(15),
            catalog_timeout: Duration::from_secs(10),
            generation: GenerationConfig::default(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Speech output configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable speech output
    pub enabled: bool,

    /// ElevenLabs voice ID
    pub voice_id: String,

    /// ElevenLabs model ID
    pub model: String,

    /// Wake phrases for interactive mode (empty = built-in variants)
    pub wake_phrases: Vec<String>,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the config file and process environment
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    #[must_use]
    pub fn from_sources(fc: HatsEyeConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            gemini: env("GEMINI_API_KEY")
                .or(fc.api_keys.gemini)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            elevenlabs: env("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
        };

        // Inference (env > toml > default)
        let defaults = InferenceConfig::default();
        let inf = fc.inference;
        let inference = InferenceConfig {
            base_url: env("HATSEYE_GEMINI_BASE_URL")
                .or(inf.base_url)
                .unwrap_or(defaults.base_url),
            api_versions: inf
                .api_versions
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_versions),
            request_timeout: inf
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            catalog_timeout: inf
                .catalog_timeout_secs
                .map_or(defaults.catalog_timeout, Duration::from_secs),
            generation: GenerationConfig {
                temperature: inf.temperature.unwrap_or(defaults.generation.temperature),
                max_output_tokens: inf
                    .max_output_tokens
                    .unwrap_or(defaults.generation.max_output_tokens),
                top_p: inf.top_p.unwrap_or(defaults.generation.top_p),
            },
            max_image_bytes: inf.max_image_bytes.unwrap_or(defaults.max_image_bytes),
        };

        let voice = VoiceConfig {
            enabled: env("HATSEYE_DISABLE_VOICE")
                .map(|v| !(v == "1" || v.eq_ignore_ascii_case("true")))
                .or(fc.voice.enabled)
                .unwrap_or(true),
            voice_id: env("HATSEYE_VOICE_ID")
                .or(fc.voice.voice_id)
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            model: env("HATSEYE_TTS_MODEL")
                .or(fc.voice.model)
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            wake_phrases: fc.voice.wake_phrases.unwrap_or_default(),
        };

        let api_server = ApiServerConfig {
            port: env("HATSEYE_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            static_dir: env("HATSEYE_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
        };

        let frame_path = env("HATSEYE_FRAME_PATH")
            .or(fc.camera.frame_path)
            .map(PathBuf::from);

        Self {
            api_keys,
            inference,
            catalog: fc.catalog.unwrap_or_default(),
            voice,
            api_server,
            frame_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = Config::from_sources(HatsEyeConfigFile::default(), env_from(&[]));

        assert!(config.api_keys.gemini.is_none());
        assert_eq!(config.inference.api_versions, ["v1beta", "v1"]);
        assert_eq!(config.inference.request_timeout, Duration::from_secs(15));
        assert_eq!(config.inference.catalog_timeout, Duration::from_secs(10));
        assert_eq!(config.inference.generation, GenerationConfig::default());
        assert_eq!(config.catalog.per_tier_cap, 2);
        assert_eq!(config.voice.voice_id, DEFAULT_VOICE_ID);
        assert!(config.voice.enabled);
        assert_eq!(config.api_server.port, DEFAULT_PORT);
        assert!(config.frame_path.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut fc = HatsEyeConfigFile::default();
        fc.api_keys.gemini = Some("from-file".to_string());
        fc.server.port = Some(6000);

        let config = Config::from_sources(
            fc,
            env_from(&[("GEMINI_API_KEY", "from-env"), ("HATSEYE_PORT", "7000")]),
        );

        assert_eq!(
            config.api_keys.gemini.as_ref().map(|k| k.expose_secret()),
            Some("from-env")
        );
        assert_eq!(config.api_server.port, 7000);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut fc = HatsEyeConfigFile::default();
        fc.inference.api_versions = Some(vec!["v1".to_string()]);
        fc.inference.max_output_tokens = Some(80);
        fc.server.port = Some(6000);

        let config = Config::from_sources(fc, env_from(&[]));

        assert_eq!(config.inference.api_versions, ["v1"]);
        assert_eq!(config.inference.generation.max_output_tokens, 80);
        assert_eq!(config.api_server.port, 6000);
    }

    #[test]
    fn test_empty_key_treated_as_missing() {
        let config = Config::from_sources(
            HatsEyeConfigFile::default(),
            env_from(&[("GEMINI_API_KEY", "")]),
        );
        assert!(config.api_keys.gemini.is_none());
    }

    #[test]
    fn test_voice_can_be_disabled_from_env() {
        let config = Config::from_sources(
            HatsEyeConfigFile::default(),
            env_from(&[("HATSEYE_DISABLE_VOICE", "true")]),
        );
        assert!(!config.voice.enabled);
    }
}

//! TOML configuration file loading
//!
//! Supports `~/.config/hatseye/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::vision::CatalogPolicy;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HatsEyeConfigFile {
    /// Inference service configuration
    #[serde(default)]
    pub inference: InferenceFileConfig,

    /// Model ranking policy; missing keys keep their defaults
    #[serde(default)]
    pub catalog: Option<CatalogPolicy>,

    /// Speech synthesis configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Camera frame handoff
    #[serde(default)]
    pub camera: CameraFileConfig,
}

/// Inference-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct InferenceFileConfig {
    /// API host (e.g. "https://generativelanguage.googleapis.com")
    pub base_url: Option<String>,

    /// API versions tried per model, in order
    pub api_versions: Option<Vec<String>>,

    /// Per-attempt timeout in seconds
    pub request_timeout_secs: Option<u64>,

    /// Capability-list timeout in seconds
    pub catalog_timeout_secs: Option<u64>,

    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,

    /// Largest accepted frame, in raw bytes
    pub max_image_bytes: Option<usize>,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable speech output
    pub enabled: Option<bool>,

    /// ElevenLabs voice ID
    pub voice_id: Option<String>,

    /// ElevenLabs model ID
    pub model: Option<String>,

    /// Wake phrases for interactive mode
    pub wake_phrases: Option<Vec<String>>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Directory holding the web UI
    pub static_dir: Option<String>,
}

/// Camera configuration
#[derive(Debug, Default, Deserialize)]
pub struct CameraFileConfig {
    /// JPEG file the capture process keeps overwriting with the latest frame
    pub frame_path: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `HatsEyeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> HatsEyeConfigFile {
    config_file_path().map_or_else(HatsEyeConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns `HatsEyeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_from(path: &Path) -> HatsEyeConfigFile {
    if !path.exists() {
        return HatsEyeConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HatsEyeConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HatsEyeConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/hatseye/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("hatseye").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config_file_from(Path::new("/nonexistent/hatseye.toml"));
        assert!(config.inference.base_url.is_none());
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_partial_file_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[inference]
api_versions = ["v1"]
request_timeout_secs = 12

[catalog]
per_tier_cap = 1

[server]
port = 5001
"#
        )
        .unwrap();

        let config = load_config_file_from(file.path());
        assert_eq!(config.inference.api_versions, Some(vec!["v1".to_string()]));
        assert_eq!(config.inference.request_timeout_secs, Some(12));
        assert_eq!(config.catalog.map(|c| c.per_tier_cap), Some(1));
        assert_eq!(config.server.port, Some(5001));
        assert!(config.voice.voice_id.is_none());
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let config = load_config_file_from(file.path());
        assert!(config.server.port.is_none());
    }
}

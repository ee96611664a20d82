//! Error types for HatsEye

use thiserror::Error;

/// Result type alias for HatsEye operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the inference cascade
///
/// Failures of individual inference attempts are not errors: they are
/// classified and folded into a [`crate::vision::Reply`].
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Image payload rejected before any request was made
    #[error("image error: {0}")]
    Image(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Model catalog could not be fetched
    #[error("catalog error: {0}")]
    Catalog(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

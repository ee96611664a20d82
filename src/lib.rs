//! HatsEye - vision assistant for visually impaired users
//!
//! This library provides the core functionality for HatsEye:
//! - Vision question answering over Gemini with model/version fallback
//! - Output sanitization deciding what may be spoken aloud
//! - Speech synthesis via ElevenLabs
//! - Wake phrase matching for hands-free use
//! - HTTP API for the web UI
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                       │
//! │        CLI (ask / interactive)  │  HTTP API         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                VisionAssistant                      │
//! │   Catalog  │  Dispatch  │  Classify  │  Sanitize    │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │ speakable only
//! ┌──────────▼──────────┐       ┌──────────▼────────────┐
//! │  Gemini REST API    │       │  ElevenLabs TTS       │
//! └─────────────────────┘       └───────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod vision;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use vision::{
    EncodedImage, FailureKind, GeminiTransport, InferenceTransport, Reply, VisionAssistant,
};
pub use voice::{SpeechSynthesizer, WakePhraseMatcher};

//! Voice output and wake phrase handling
//!
//! Speech synthesis only ever receives speakable replies; the wake phrase
//! matcher gates transcribed input in interactive mode.

mod tts;
mod wake_phrase;

pub use tts::{DEFAULT_TTS_BASE_URL, SpeechSynthesizer};
pub use wake_phrase::{DEFAULT_WAKE_PHRASES, WakePhraseMatcher};

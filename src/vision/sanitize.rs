//! Output normalization and speakability tagging

/// Substrings (matched lowercase) that mark text as unfit for speech
const SUPPRESS_MARKERS: &[&str] = &[
    "debug",
    "\u{26a0}",
    "quota",
    "exceeded",
    "billing",
    "please check",
    "api key error",
    "google cloud",
    "couldn't analyze",
];

/// Prefixes (case-sensitive) that mark text as an error report
const SUPPRESS_PREFIXES: &[&str] = &["Error:", "I couldn't"];

/// Whether text may be forwarded to speech synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Safe to speak
    Speakable,
    /// Display only
    Suppressed,
}

impl Disposition {
    /// Shorthand for `== Disposition::Speakable`
    #[must_use]
    pub fn is_speakable(self) -> bool {
        self == Self::Speakable
    }
}

/// Trim and terminate text with punctuation
///
/// Empty text stays empty.
#[must_use]
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Decide whether normalized text is speakable
#[must_use]
pub fn disposition(text: &str) -> Disposition {
    if text.is_empty() || SUPPRESS_PREFIXES.iter().any(|p| text.starts_with(p)) {
        return Disposition::Suppressed;
    }

    let lower = text.to_lowercase();
    if SUPPRESS_MARKERS.iter().any(|m| lower.contains(m)) {
        Disposition::Suppressed
    } else {
        Disposition::Speakable
    }
}

/// Normalize text and tag it
#[must_use]
pub fn sanitize(text: &str) -> (String, Disposition) {
    let normalized = normalize(text);
    let tag = disposition(&normalized);
    (normalized, tag)
}

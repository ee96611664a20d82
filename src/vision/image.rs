//! Inline image payloads

use base64::Engine;

use crate::{Error, Result};

/// Default upper bound on raw image bytes accepted for a request
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// A pre-downscaled JPEG frame, base64-encoded for inlining
#[derive(Debug, Clone)]
pub struct EncodedImage {
    data: String,
}

impl EncodedImage {
    /// Encode raw JPEG bytes
    ///
    /// # Errors
    ///
    /// Returns error if the image is empty or larger than `max_bytes`
    pub fn from_jpeg(bytes: &[u8], max_bytes: usize) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Image("empty image".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(Error::Image(format!(
                "image is {} bytes, limit is {max_bytes}",
                bytes.len()
            )));
        }

        Ok(Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }

    /// Accept an already base64-encoded JPEG, validating it decodes within the bound
    ///
    /// A `data:image/jpeg;base64,` prefix, as produced by browser canvases, is stripped.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not valid base64, empty, or too large
    pub fn from_base64(encoded: &str, max_bytes: usize) -> Result<Self> {
        let encoded = encoded.trim();
        let encoded = encoded
            .split_once(";base64,")
            .map_or(encoded, |(_, data)| data);

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::Image(format!("invalid base64: {e}")))?;
        Self::from_jpeg(&bytes, max_bytes)
    }

    /// MIME type sent alongside the data
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    /// Base64 payload
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

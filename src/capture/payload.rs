//! Opaque encoded-image payloads and the data-URI codec at the boundary.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// An encoded image as captured from any input channel (file picker,
/// clipboard paste, camera still). The orchestration layer treats the
/// contents as opaque; only the service boundary looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Media type, e.g. `image/png`. Not validated against the data.
    pub mime: String,
    /// Base64-encoded bytes, without the `data:` header.
    pub data: String,
}

impl ImagePayload {
    pub fn new(mime: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime: mime.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Lenient decode of a `data:` URI. A string without the expected
    /// header becomes an octet-stream payload around the raw text —
    /// uploads are not validated, a garbage file yields a garbage
    /// payload.
    pub fn from_data_uri(uri: &str) -> Self {
        if let Some(rest) = uri.strip_prefix("data:") {
            if let Some((header, data)) = rest.split_once(',') {
                let mime = header.split(';').next().unwrap_or("").trim();
                let mime = if mime.is_empty() {
                    "application/octet-stream"
                } else {
                    mime
                };
                return Self::new(mime, data);
            }
        }
        Self::new("application/octet-stream", uri)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

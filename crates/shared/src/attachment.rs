//! Image attachments sent inline alongside a prompt.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Handle to a transient preview (a texture in the UI) owned by the
/// conversation store. Released when the attachment is removed or sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PreviewRef(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Base64-encoded file content
    pub data: String,
    /// Media type, e.g. "image/png"
    pub mime_type: String,
    /// File name shown on the chip
    pub name: String,
    /// Assigned by the store when the attachment is added
    pub preview: Option<PreviewRef>,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            name: name.into(),
            preview: None,
        }
    }

    /// Encode raw file bytes.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(name, mime_type, STANDARD.encode(bytes))
    }

    /// Attachments missing content or media type are skipped when building
    /// a request.
    pub fn is_sendable(&self) -> bool {
        !self.data.is_empty() && !self.mime_type.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_encodes_base64() {
        let att = Attachment::from_bytes("dot.png", "image/png", b"hello");
        assert_eq!(att.data, "aGVsbG8=");
        assert_eq!(att.mime_type, "image/png");
        assert!(att.preview.is_none());
        assert!(att.is_sendable());
    }

    #[test]
    fn test_missing_fields_not_sendable() {
        assert!(!Attachment::new("a.png", "image/png", "").is_sendable());
        assert!(!Attachment::new("a.png", "  ", "aGVsbG8=").is_sendable());
    }
}

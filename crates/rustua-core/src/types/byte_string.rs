use crate::DecodeError;
use base64::{engine::general_purpose, Engine as _};

/// An opaque byte sequence that distinguishes null from empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteString(Option<Vec<u8>>);

impl ByteString {
    pub const fn null() -> Self {
        Self(None)
    }

    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Some(bytes.into()))
    }

    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }

    /// Length in bytes; zero for a null byte string.
    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_inner(self) -> Option<Vec<u8>> {
        self.0
    }

    /// Standard base64 text of the contents; `None` for a null byte string.
    pub fn to_base64(&self) -> Option<String> {
        self.0.as_ref().map(|b| general_purpose::STANDARD.encode(b))
    }

    /// Decodes base64 text. Empty text yields an empty, non-null byte string.
    pub fn from_base64(text: &str) -> Result<Self, DecodeError> {
        general_purpose::STANDARD
            .decode(text.trim())
            .map(|b| Self(Some(b)))
            .map_err(|e| DecodeError::malformed("ByteString", e.to_string()))
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(value: Vec<u8>) -> Self {
        Self(Some(value))
    }
}

impl From<&[u8]> for ByteString {
    fn from(value: &[u8]) -> Self {
        Self(Some(value.to_vec()))
    }
}

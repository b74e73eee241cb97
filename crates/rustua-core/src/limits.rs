/// Bounds applied by every decoder and encoder.
///
/// A limit of `0` is taken literally; use [`EncodingLimits::unbounded`] to
/// lift all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EncodingLimits {
    /// Maximum nesting of structures, arrays and extension objects.
    pub max_depth: usize,
    pub max_array_length: usize,
    /// Maximum length of a String or XmlElement, in bytes.
    pub max_string_length: usize,
    pub max_byte_string_length: usize,
    /// Maximum size of a whole encoded message, in bytes.
    pub max_message_size: usize,
}

impl EncodingLimits {
    pub const DEFAULT_MAX_DEPTH: usize = 100;
    pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 65_535;
    pub const DEFAULT_MAX_STRING_LENGTH: usize = 1 << 20;
    pub const DEFAULT_MAX_BYTE_STRING_LENGTH: usize = 1 << 22;
    pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1 << 24;

    pub const fn unbounded() -> Self {
        Self {
            max_depth: usize::MAX,
            max_array_length: usize::MAX,
            max_string_length: usize::MAX,
            max_byte_string_length: usize::MAX,
            max_message_size: usize::MAX,
        }
    }

    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    pub fn with_max_array_length(mut self, max: usize) -> Self {
        self.max_array_length = max;
        self
    }

    pub fn with_max_string_length(mut self, max: usize) -> Self {
        self.max_string_length = max;
        self
    }

    pub fn with_max_byte_string_length(mut self, max: usize) -> Self {
        self.max_byte_string_length = max;
        self
    }

    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }
}

impl Default for EncodingLimits {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_array_length: Self::DEFAULT_MAX_ARRAY_LENGTH,
            max_string_length: Self::DEFAULT_MAX_STRING_LENGTH,
            max_byte_string_length: Self::DEFAULT_MAX_BYTE_STRING_LENGTH,
            max_message_size: Self::DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

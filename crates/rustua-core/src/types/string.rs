/// A UTF-8 string that distinguishes null from empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct UaString(Option<String>);

impl UaString {
    pub const fn null() -> Self {
        Self(None)
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Length in bytes; zero for a null string.
    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, String::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

impl From<&str> for UaString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UaString {
    fn from(value: String) -> Self {
        Self(Some(value))
    }
}

impl From<Option<String>> for UaString {
    fn from(value: Option<String>) -> Self {
        Self(value)
    }
}

/// An XML fragment carried verbatim as text.
///
/// The codecs never parse the fragment; it round-trips as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct XmlElement(Option<String>);

impl XmlElement {
    pub const fn null() -> Self {
        Self(None)
    }

    pub fn new(fragment: impl Into<String>) -> Self {
        Self(Some(fragment.into()))
    }

    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

impl From<Option<String>> for XmlElement {
    fn from(value: Option<String>) -> Self {
        Self(value)
    }
}

use crate::types::UaString;

/// A name qualified by a namespace index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: UaString,
}

impl QualifiedName {
    pub fn new(namespace_index: u16, name: impl Into<UaString>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }
}

/// Human readable text with an optional locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LocalizedText {
    pub locale: UaString,
    pub text: UaString,
}

impl LocalizedText {
    pub const NULL: Self = Self {
        locale: UaString::null(),
        text: UaString::null(),
    };

    pub fn new(locale: impl Into<UaString>, text: impl Into<UaString>) -> Self {
        Self {
            locale: locale.into(),
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<UaString>) -> Self {
        Self {
            locale: UaString::null(),
            text: text.into(),
        }
    }
}

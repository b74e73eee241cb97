use thiserror::Error;

/// A namespace index or URI could not be mapped through a namespace table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("namespace index {0} is not in the namespace table")]
    IndexOutOfBounds(u16),
    #[error("namespace uri '{0}' is not in the namespace table")]
    UnknownUri(String),
    #[error("namespace table is full")]
    TableFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{kind} value '{literal}' is out of range")]
    OutOfRange { kind: &'static str, literal: String },
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("malformed {kind} literal: {detail}")]
    MalformedLiteral { kind: &'static str, detail: String },
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error("unknown encoding identity {0}")]
    UnknownEncodingIdentity(String),
    #[error("unknown data type {0}")]
    UnknownDataType(String),
    #[error("{found} is not a subtype of {expected}")]
    NotASubtype { expected: String, found: String },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid length {0}")]
    InvalidLength(i64),
    #[error("{what} limit of {limit} exceeded")]
    LimitExceeded { what: &'static str, limit: usize },
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("invalid decoder state: {0}")]
    InvalidState(&'static str),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl DecodeError {
    pub(crate) fn malformed(kind: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedLiteral {
            kind,
            detail: detail.into(),
        }
    }

    pub(crate) fn out_of_range(kind: &'static str, literal: impl ToString) -> Self {
        Self::OutOfRange {
            kind,
            literal: literal.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("buffer too small")]
    BufferTooSmall,
    #[error("{kind} value is out of range")]
    OutOfRange { kind: &'static str },
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error("unknown data type {0}")]
    UnknownDataType(String),
    #[error("value does not match schema: {0}")]
    SchemaMismatch(String),
    #[error("character {0:?} cannot be written as XML text")]
    InvalidCharacter(char),
    #[error("{what} limit of {limit} exceeded")]
    LimitExceeded { what: &'static str, limit: usize },
    #[error("invalid encoder state: {0}")]
    InvalidState(&'static str),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

/// Errors raised while building a [`DataTypeRegistry`](crate::registry::DataTypeRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error("data type {0} is registered twice")]
    DuplicateType(String),
    #[error("encoding identity {0} is registered twice")]
    DuplicateEncoding(String),
    #[error("structure '{structure}' declares field '{field}' more than once")]
    DuplicateField { structure: String, field: String },
    #[error("field '{field}' of '{structure}' has unknown data type {data_type}")]
    UnknownFieldType {
        structure: String,
        field: String,
        data_type: String,
    },
    #[error("field '{field}' of '{structure}' uses unsupported {what}")]
    UnsupportedField {
        structure: String,
        field: String,
        what: String,
    },
    #[error("alias {0} does not resolve to a concrete data type")]
    UnresolvedAlias(String),
}

//! OPC UA structured-type encoding and decoding in pure Rust.
//!
//! `rustua-core` converts schema-described values (scalars, arrays, nested
//! structures and polymorphic extension objects) to and from the OPC UA
//! binary, XML and JSON encodings. Structure definitions are plain data
//! walked by one generic codec; a [`DataTypeRegistry`] maps type and
//! encoding identities to codecs so extension objects decode into the
//! right concrete structure.
//!
//! # Feature flags
//!
//! - **`serde`**: derives `Serialize`/`Deserialize` on schema, limit and
//!   namespace types.

/// Shipped namespace-0 structure definitions.
pub mod catalog;
/// Namespace table, registry and limits shared by one encode or decode call.
pub mod context;
/// Decoder/encoder interfaces and the binary, JSON and XML backends.
pub mod encoding;
/// Error types for decoding, encoding, registration and namespace resolution.
pub mod error;
pub mod limits;
/// Type registry keyed by data type and encoding identities.
pub mod registry;
/// Structure definitions and their compiled field layouts.
pub mod schema;
pub mod structure;
/// Built-in OPC UA scalar types, node identifiers and structured values.
pub mod types;

pub use context::EncodingContext;
pub use error::{DecodeError, EncodeError, NamespaceError, RegistryError};
pub use limits::EncodingLimits;
pub use registry::{DataTypeCodec, DataTypeRegistry, DataTypeRegistryBuilder};
pub use structure::GenericStructureCodec;

//! OPC UA binary encoding: little-endian scalars, Int32 length prefixes
//! with `-1` for null, and length-prefixed extension-object bodies.

mod decoder;
mod encoder;
pub mod reader;
pub mod writer;

pub use decoder::BinaryDecoder;
pub use encoder::BinaryEncoder;

/// Extension object without a body.
pub const BODY_NONE: u8 = 0x00;
/// Extension object with a binary body.
pub const BODY_BINARY: u8 = 0x01;
/// Extension object with an XML body.
pub const BODY_XML: u8 = 0x02;

pub(crate) const NODE_ID_TWO_BYTE: u8 = 0x00;
pub(crate) const NODE_ID_FOUR_BYTE: u8 = 0x01;
pub(crate) const NODE_ID_NUMERIC: u8 = 0x02;
pub(crate) const NODE_ID_STRING: u8 = 0x03;
pub(crate) const NODE_ID_GUID: u8 = 0x04;
pub(crate) const NODE_ID_OPAQUE: u8 = 0x05;
pub(crate) const NODE_ID_TYPE_MASK: u8 = 0x3F;
pub(crate) const NAMESPACE_URI_FLAG: u8 = 0x80;
pub(crate) const SERVER_INDEX_FLAG: u8 = 0x40;

pub(crate) const LOCALIZED_TEXT_LOCALE: u8 = 0x01;
pub(crate) const LOCALIZED_TEXT_TEXT: u8 = 0x02;

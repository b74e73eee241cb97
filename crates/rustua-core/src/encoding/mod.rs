//! Format-specific decoders and encoders behind one field-oriented interface.
//!
//! Every read and write takes an optional field name. Binary ignores it;
//! XML and JSON use it to find or emit the named member of the structure
//! the cursor is inside. `None` means the next value in document order,
//! which is how array elements are read and written.

pub mod binary;
pub mod json;
mod literal;
pub mod xml;

pub use binary::{BinaryDecoder, BinaryEncoder};
pub use json::{JsonDecoder, JsonEncoder};
pub use xml::{XmlDecoder, XmlEncoder};

use crate::context::EncodingContext;
use crate::types::{
    ByteString, DateTime, ExpandedNodeId, Guid, LocalizedText, NodeId, QualifiedName,
    StatusCode, StructValue, UaString, Value, WireFormat, XmlElement,
};
use crate::{structure, DecodeError, EncodeError};

pub trait Decoder {
    fn context(&self) -> &EncodingContext;

    fn format(&self) -> WireFormat;

    fn read_boolean(&mut self, field: Option<&str>) -> Result<bool, DecodeError>;
    fn read_sbyte(&mut self, field: Option<&str>) -> Result<i8, DecodeError>;
    fn read_byte(&mut self, field: Option<&str>) -> Result<u8, DecodeError>;
    fn read_int16(&mut self, field: Option<&str>) -> Result<i16, DecodeError>;
    fn read_uint16(&mut self, field: Option<&str>) -> Result<u16, DecodeError>;
    fn read_int32(&mut self, field: Option<&str>) -> Result<i32, DecodeError>;
    fn read_uint32(&mut self, field: Option<&str>) -> Result<u32, DecodeError>;
    fn read_int64(&mut self, field: Option<&str>) -> Result<i64, DecodeError>;
    fn read_uint64(&mut self, field: Option<&str>) -> Result<u64, DecodeError>;
    fn read_float(&mut self, field: Option<&str>) -> Result<f32, DecodeError>;
    fn read_double(&mut self, field: Option<&str>) -> Result<f64, DecodeError>;
    fn read_string(&mut self, field: Option<&str>) -> Result<UaString, DecodeError>;
    fn read_date_time(&mut self, field: Option<&str>) -> Result<DateTime, DecodeError>;
    fn read_guid(&mut self, field: Option<&str>) -> Result<Guid, DecodeError>;
    fn read_byte_string(&mut self, field: Option<&str>) -> Result<ByteString, DecodeError>;
    fn read_xml_element(&mut self, field: Option<&str>) -> Result<XmlElement, DecodeError>;
    fn read_node_id(&mut self, field: Option<&str>) -> Result<NodeId, DecodeError>;
    fn read_expanded_node_id(&mut self, field: Option<&str>)
        -> Result<ExpandedNodeId, DecodeError>;
    fn read_status_code(&mut self, field: Option<&str>) -> Result<StatusCode, DecodeError>;
    fn read_qualified_name(&mut self, field: Option<&str>) -> Result<QualifiedName, DecodeError>;
    fn read_localized_text(&mut self, field: Option<&str>) -> Result<LocalizedText, DecodeError>;
    /// Reads the Int32 value of an enumeration.
    fn read_enumeration(&mut self, field: Option<&str>) -> Result<i32, DecodeError>;

    /// Presence mask of the optional fields of the current structure, bit
    /// `i` for `optional_fields[i]`. Binary reads it from the stream; XML
    /// and JSON derive it from which members exist.
    fn read_optional_mask(&mut self, optional_fields: &[&str]) -> Result<u32, DecodeError>;

    fn begin_struct(&mut self, field: Option<&str>) -> Result<(), DecodeError>;
    fn end_struct(&mut self) -> Result<(), DecodeError>;

    /// Returns the element count, or `None` for a null array. A null array
    /// is fully consumed and must not be closed with [`Decoder::end_array`].
    fn begin_array(&mut self, field: Option<&str>) -> Result<Option<usize>, DecodeError>;
    fn end_array(&mut self) -> Result<(), DecodeError>;

    /// Opens an extension-object envelope and returns the encoding id it
    /// carries, or `None` for a null extension object (already consumed).
    fn begin_extension_object(&mut self, field: Option<&str>)
        -> Result<Option<NodeId>, DecodeError>;
    fn end_extension_object(&mut self) -> Result<(), DecodeError>;

    /// Reads a value of a structured `data_type`: inline when the type is a
    /// registered concrete structure, as an extension object when abstract.
    fn read_struct(
        &mut self,
        field: Option<&str>,
        data_type: &ExpandedNodeId,
    ) -> Result<Value, DecodeError>;

    fn read_struct_array(
        &mut self,
        field: Option<&str>,
        data_type: &ExpandedNodeId,
    ) -> Result<Value, DecodeError>;
}

pub trait Encoder {
    fn context(&self) -> &EncodingContext;

    fn format(&self) -> WireFormat;

    fn write_boolean(&mut self, field: Option<&str>, value: bool) -> Result<(), EncodeError>;
    fn write_sbyte(&mut self, field: Option<&str>, value: i8) -> Result<(), EncodeError>;
    fn write_byte(&mut self, field: Option<&str>, value: u8) -> Result<(), EncodeError>;
    fn write_int16(&mut self, field: Option<&str>, value: i16) -> Result<(), EncodeError>;
    fn write_uint16(&mut self, field: Option<&str>, value: u16) -> Result<(), EncodeError>;
    fn write_int32(&mut self, field: Option<&str>, value: i32) -> Result<(), EncodeError>;
    fn write_uint32(&mut self, field: Option<&str>, value: u32) -> Result<(), EncodeError>;
    fn write_int64(&mut self, field: Option<&str>, value: i64) -> Result<(), EncodeError>;
    fn write_uint64(&mut self, field: Option<&str>, value: u64) -> Result<(), EncodeError>;
    fn write_float(&mut self, field: Option<&str>, value: f32) -> Result<(), EncodeError>;
    fn write_double(&mut self, field: Option<&str>, value: f64) -> Result<(), EncodeError>;
    fn write_string(&mut self, field: Option<&str>, value: &UaString) -> Result<(), EncodeError>;
    fn write_date_time(&mut self, field: Option<&str>, value: DateTime)
        -> Result<(), EncodeError>;
    fn write_guid(&mut self, field: Option<&str>, value: &Guid) -> Result<(), EncodeError>;
    fn write_byte_string(
        &mut self,
        field: Option<&str>,
        value: &ByteString,
    ) -> Result<(), EncodeError>;
    fn write_xml_element(
        &mut self,
        field: Option<&str>,
        value: &XmlElement,
    ) -> Result<(), EncodeError>;
    fn write_node_id(&mut self, field: Option<&str>, value: &NodeId) -> Result<(), EncodeError>;
    fn write_expanded_node_id(
        &mut self,
        field: Option<&str>,
        value: &ExpandedNodeId,
    ) -> Result<(), EncodeError>;
    fn write_status_code(
        &mut self,
        field: Option<&str>,
        value: StatusCode,
    ) -> Result<(), EncodeError>;
    fn write_qualified_name(
        &mut self,
        field: Option<&str>,
        value: &QualifiedName,
    ) -> Result<(), EncodeError>;
    fn write_localized_text(
        &mut self,
        field: Option<&str>,
        value: &LocalizedText,
    ) -> Result<(), EncodeError>;
    fn write_enumeration(&mut self, field: Option<&str>, value: i32) -> Result<(), EncodeError>;

    /// Binary writes the mask; XML and JSON express presence by omission.
    fn write_optional_mask(&mut self, mask: u32) -> Result<(), EncodeError>;

    /// `type_name` names the element of an unnamed structure in XML.
    fn begin_struct(&mut self, field: Option<&str>, type_name: &str) -> Result<(), EncodeError>;
    fn end_struct(&mut self) -> Result<(), EncodeError>;

    fn begin_array(&mut self, field: Option<&str>, len: usize) -> Result<(), EncodeError>;
    fn end_array(&mut self) -> Result<(), EncodeError>;
    fn write_null_array(&mut self, field: Option<&str>) -> Result<(), EncodeError>;

    fn begin_extension_object(
        &mut self,
        field: Option<&str>,
        encoding_id: &NodeId,
        type_name: &str,
    ) -> Result<(), EncodeError>;
    fn end_extension_object(&mut self) -> Result<(), EncodeError>;
    fn write_null_extension_object(&mut self, field: Option<&str>) -> Result<(), EncodeError>;

    fn write_struct(
        &mut self,
        field: Option<&str>,
        value: &Value,
        data_type: &ExpandedNodeId,
    ) -> Result<(), EncodeError>;

    fn write_struct_array(
        &mut self,
        field: Option<&str>,
        value: &Value,
        data_type: &ExpandedNodeId,
    ) -> Result<(), EncodeError>;
}

fn check_message_size(ctx: &EncodingContext, size: usize) -> Result<(), DecodeError> {
    let limit = ctx.limits().max_message_size;
    if size > limit {
        return Err(DecodeError::LimitExceeded {
            what: "message size",
            limit,
        });
    }
    Ok(())
}

/// Decodes a binary-encoded body of the concrete structure `type_id`.
pub fn decode_binary(
    ctx: &EncodingContext,
    bytes: &[u8],
    type_id: &ExpandedNodeId,
) -> Result<StructValue, DecodeError> {
    check_message_size(ctx, bytes.len())?;
    let mut decoder = BinaryDecoder::new(ctx.clone(), bytes);
    let value = structure::decode_root(&mut decoder, type_id)?;
    if !decoder.is_empty() {
        log::debug!(
            "{} trailing bytes after {type_id}",
            decoder.remaining()
        );
    }
    Ok(value)
}

/// Encodes `value` into `buf` and returns the number of bytes written.
pub fn encode_binary(
    ctx: &EncodingContext,
    value: &StructValue,
    buf: &mut [u8],
) -> Result<usize, EncodeError> {
    let mut encoder = BinaryEncoder::new(ctx.clone(), buf);
    structure::encode_root(&mut encoder, value)?;
    Ok(encoder.position())
}

pub fn decode_json(
    ctx: &EncodingContext,
    text: &str,
    type_id: &ExpandedNodeId,
) -> Result<StructValue, DecodeError> {
    let mut decoder = JsonDecoder::parse(ctx.clone(), text)?;
    structure::decode_root(&mut decoder, type_id)
}

pub fn encode_json(ctx: &EncodingContext, value: &StructValue) -> Result<String, EncodeError> {
    let mut encoder = JsonEncoder::new(ctx.clone());
    structure::encode_root(&mut encoder, value)?;
    encoder.finish_string()
}

pub fn decode_xml(
    ctx: &EncodingContext,
    text: &str,
    type_id: &ExpandedNodeId,
) -> Result<StructValue, DecodeError> {
    let mut decoder = XmlDecoder::parse(ctx.clone(), text)?;
    structure::decode_root(&mut decoder, type_id)
}

pub fn encode_xml(ctx: &EncodingContext, value: &StructValue) -> Result<String, EncodeError> {
    let mut encoder = XmlEncoder::new(ctx.clone());
    structure::encode_root(&mut encoder, value)?;
    encoder.finish_string()
}

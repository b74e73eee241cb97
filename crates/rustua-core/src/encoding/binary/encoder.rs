use super::writer::Writer;
use super::{
    BODY_BINARY, BODY_NONE, LOCALIZED_TEXT_LOCALE, LOCALIZED_TEXT_TEXT, NAMESPACE_URI_FLAG,
    NODE_ID_FOUR_BYTE, NODE_ID_GUID, NODE_ID_NUMERIC, NODE_ID_OPAQUE, NODE_ID_STRING,
    NODE_ID_TWO_BYTE, SERVER_INDEX_FLAG,
};
use crate::context::EncodingContext;
use crate::encoding::Encoder;
use crate::structure;
use crate::types::{
    ByteString, DateTime, ExpandedNodeId, Guid, Identifier, LocalizedText, NamespaceRef, NodeId,
    QualifiedName, StatusCode, UaString, Value, WireFormat, XmlElement,
};
use crate::EncodeError;

/// Writes the OPC UA binary encoding into a caller-owned buffer.
#[derive(Debug)]
pub struct BinaryEncoder<'a> {
    ctx: EncodingContext,
    writer: Writer<'a>,
    depth: usize,
    /// Offsets of the length slots of open extension-object bodies.
    bodies: Vec<usize>,
}

impl<'a> BinaryEncoder<'a> {
    pub fn new(ctx: EncodingContext, buf: &'a mut [u8]) -> Self {
        Self {
            ctx,
            writer: Writer::new(buf),
            depth: 0,
            bodies: Vec::new(),
        }
    }

    /// Starts over on a new buffer, keeping the context.
    pub fn reset(&mut self, buf: &'a mut [u8]) {
        self.writer = Writer::new(buf);
        self.depth = 0;
        self.bodies.clear();
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.writer.position()
    }

    pub fn as_written(&self) -> &[u8] {
        self.writer.as_written()
    }

    fn enter(&mut self) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_depth;
        if self.depth >= limit {
            return Err(EncodeError::LimitExceeded {
                what: "nesting depth",
                limit,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn check_size(&self, extra: usize) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_message_size;
        if self.writer.position().saturating_add(extra) > limit {
            return Err(EncodeError::LimitExceeded {
                what: "message size",
                limit,
            });
        }
        Ok(())
    }

    fn write_length(
        &mut self,
        len: usize,
        what: &'static str,
        limit: usize,
    ) -> Result<(), EncodeError> {
        if len > limit {
            return Err(EncodeError::LimitExceeded { what, limit });
        }
        let len = i32::try_from(len).map_err(|_| EncodeError::OutOfRange { kind: what })?;
        self.writer.write_le_i32(len)
    }

    fn write_bytes(
        &mut self,
        bytes: Option<&[u8]>,
        what: &'static str,
        limit: usize,
    ) -> Result<(), EncodeError> {
        match bytes {
            Some(bytes) => {
                self.check_size(bytes.len())?;
                self.write_length(bytes.len(), what, limit)?;
                self.writer.write_all(bytes)
            }
            None => self.writer.write_le_i32(-1),
        }
    }

    fn write_text(&mut self, text: Option<&str>) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_string_length;
        self.write_bytes(text.map(str::as_bytes), "string length", limit)
    }

    fn write_node_id_with_flags(&mut self, node_id: &NodeId, flags: u8) -> Result<(), EncodeError> {
        let ns = node_id.namespace;
        match &node_id.identifier {
            Identifier::Numeric(id) => match (u8::try_from(ns), u8::try_from(*id), u16::try_from(*id)) {
                (Ok(0), Ok(small), _) => {
                    self.writer.write_u8(NODE_ID_TWO_BYTE | flags)?;
                    self.writer.write_u8(small)
                }
                (Ok(ns), _, Ok(id)) => {
                    self.writer.write_u8(NODE_ID_FOUR_BYTE | flags)?;
                    self.writer.write_u8(ns)?;
                    self.writer.write_le_u16(id)
                }
                _ => {
                    self.writer.write_u8(NODE_ID_NUMERIC | flags)?;
                    self.writer.write_le_u16(ns)?;
                    self.writer.write_le_u32(*id)
                }
            },
            Identifier::String(s) => {
                self.writer.write_u8(NODE_ID_STRING | flags)?;
                self.writer.write_le_u16(ns)?;
                self.write_text(Some(s))
            }
            Identifier::Guid(guid) => {
                self.writer.write_u8(NODE_ID_GUID | flags)?;
                self.writer.write_le_u16(ns)?;
                self.write_guid(None, guid)
            }
            Identifier::Opaque(bytes) => {
                self.writer.write_u8(NODE_ID_OPAQUE | flags)?;
                self.writer.write_le_u16(ns)?;
                let limit = self.ctx.limits().max_byte_string_length;
                self.write_bytes(Some(bytes), "byte string length", limit)
            }
        }
    }
}

impl<'a> Encoder for BinaryEncoder<'a> {
    fn context(&self) -> &EncodingContext {
        &self.ctx
    }

    fn format(&self) -> WireFormat {
        WireFormat::Binary
    }

    fn write_boolean(&mut self, _field: Option<&str>, value: bool) -> Result<(), EncodeError> {
        self.writer.write_u8(u8::from(value))
    }

    fn write_sbyte(&mut self, _field: Option<&str>, value: i8) -> Result<(), EncodeError> {
        self.writer.write_all(&value.to_le_bytes())
    }

    fn write_byte(&mut self, _field: Option<&str>, value: u8) -> Result<(), EncodeError> {
        self.writer.write_u8(value)
    }

    fn write_int16(&mut self, _field: Option<&str>, value: i16) -> Result<(), EncodeError> {
        self.writer.write_le_i16(value)
    }

    fn write_uint16(&mut self, _field: Option<&str>, value: u16) -> Result<(), EncodeError> {
        self.writer.write_le_u16(value)
    }

    fn write_int32(&mut self, _field: Option<&str>, value: i32) -> Result<(), EncodeError> {
        self.writer.write_le_i32(value)
    }

    fn write_uint32(&mut self, _field: Option<&str>, value: u32) -> Result<(), EncodeError> {
        self.writer.write_le_u32(value)
    }

    fn write_int64(&mut self, _field: Option<&str>, value: i64) -> Result<(), EncodeError> {
        self.writer.write_le_i64(value)
    }

    fn write_uint64(&mut self, _field: Option<&str>, value: u64) -> Result<(), EncodeError> {
        self.writer.write_le_u64(value)
    }

    fn write_float(&mut self, _field: Option<&str>, value: f32) -> Result<(), EncodeError> {
        self.writer.write_le_f32(value)
    }

    fn write_double(&mut self, _field: Option<&str>, value: f64) -> Result<(), EncodeError> {
        self.writer.write_le_f64(value)
    }

    fn write_string(&mut self, _field: Option<&str>, value: &UaString) -> Result<(), EncodeError> {
        self.write_text(value.as_str())
    }

    fn write_date_time(&mut self, _field: Option<&str>, value: DateTime) -> Result<(), EncodeError> {
        self.writer.write_le_i64(value.ticks())
    }

    fn write_guid(&mut self, _field: Option<&str>, value: &Guid) -> Result<(), EncodeError> {
        let (data1, data2, data3, data4) = value.as_fields();
        self.writer.write_le_u32(data1)?;
        self.writer.write_le_u16(data2)?;
        self.writer.write_le_u16(data3)?;
        self.writer.write_all(data4)
    }

    fn write_byte_string(
        &mut self,
        _field: Option<&str>,
        value: &ByteString,
    ) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_byte_string_length;
        self.write_bytes(value.as_bytes(), "byte string length", limit)
    }

    fn write_xml_element(
        &mut self,
        _field: Option<&str>,
        value: &XmlElement,
    ) -> Result<(), EncodeError> {
        self.write_text(value.fragment())
    }

    fn write_node_id(&mut self, _field: Option<&str>, value: &NodeId) -> Result<(), EncodeError> {
        self.write_node_id_with_flags(value, 0)
    }

    fn write_expanded_node_id(
        &mut self,
        _field: Option<&str>,
        value: &ExpandedNodeId,
    ) -> Result<(), EncodeError> {
        let (namespace, uri) = match &value.namespace {
            NamespaceRef::Index(index) => (*index, None),
            NamespaceRef::Uri(uri) => (0, Some(uri.as_str())),
        };
        let mut flags = 0;
        if uri.is_some() {
            flags |= NAMESPACE_URI_FLAG;
        }
        if value.server_index != 0 {
            flags |= SERVER_INDEX_FLAG;
        }
        let node_id = NodeId {
            namespace,
            identifier: value.identifier.clone(),
        };
        self.write_node_id_with_flags(&node_id, flags)?;
        if uri.is_some() {
            self.write_text(uri)?;
        }
        if value.server_index != 0 {
            self.writer.write_le_u32(value.server_index)?;
        }
        Ok(())
    }

    fn write_status_code(
        &mut self,
        _field: Option<&str>,
        value: StatusCode,
    ) -> Result<(), EncodeError> {
        self.writer.write_le_u32(value.bits())
    }

    fn write_qualified_name(
        &mut self,
        _field: Option<&str>,
        value: &QualifiedName,
    ) -> Result<(), EncodeError> {
        self.writer.write_le_u16(value.namespace_index)?;
        self.write_text(value.name.as_str())
    }

    fn write_localized_text(
        &mut self,
        _field: Option<&str>,
        value: &LocalizedText,
    ) -> Result<(), EncodeError> {
        let mut mask = 0;
        if !value.locale.is_null() {
            mask |= LOCALIZED_TEXT_LOCALE;
        }
        if !value.text.is_null() {
            mask |= LOCALIZED_TEXT_TEXT;
        }
        self.writer.write_u8(mask)?;
        if let Some(locale) = value.locale.as_str() {
            self.write_text(Some(locale))?;
        }
        if let Some(text) = value.text.as_str() {
            self.write_text(Some(text))?;
        }
        Ok(())
    }

    fn write_enumeration(&mut self, _field: Option<&str>, value: i32) -> Result<(), EncodeError> {
        self.writer.write_le_i32(value)
    }

    fn write_optional_mask(&mut self, mask: u32) -> Result<(), EncodeError> {
        self.writer.write_le_u32(mask)
    }

    fn begin_struct(&mut self, _field: Option<&str>, _type_name: &str) -> Result<(), EncodeError> {
        self.enter()
    }

    fn end_struct(&mut self) -> Result<(), EncodeError> {
        self.leave();
        Ok(())
    }

    fn begin_array(&mut self, _field: Option<&str>, len: usize) -> Result<(), EncodeError> {
        self.write_length(len, "array length", self.ctx.limits().max_array_length)?;
        self.enter()
    }

    fn end_array(&mut self) -> Result<(), EncodeError> {
        self.leave();
        Ok(())
    }

    fn write_null_array(&mut self, _field: Option<&str>) -> Result<(), EncodeError> {
        self.writer.write_le_i32(-1)
    }

    fn begin_extension_object(
        &mut self,
        _field: Option<&str>,
        encoding_id: &NodeId,
        _type_name: &str,
    ) -> Result<(), EncodeError> {
        self.enter()?;
        self.write_node_id(None, encoding_id)?;
        self.writer.write_u8(BODY_BINARY)?;
        let slot = self.writer.position();
        self.writer.write_le_i32(0)?;
        self.bodies.push(slot);
        Ok(())
    }

    fn end_extension_object(&mut self) -> Result<(), EncodeError> {
        let slot = self
            .bodies
            .pop()
            .ok_or(EncodeError::InvalidState("no open extension object"))?;
        let len = self.writer.position() - slot - 4;
        let len = i32::try_from(len).map_err(|_| EncodeError::OutOfRange {
            kind: "extension object length",
        })?;
        self.writer.patch_le_i32(slot, len)?;
        self.leave();
        Ok(())
    }

    fn write_null_extension_object(&mut self, _field: Option<&str>) -> Result<(), EncodeError> {
        self.write_node_id(None, &NodeId::NULL)?;
        self.writer.write_u8(BODY_NONE)
    }

    fn write_struct(
        &mut self,
        field: Option<&str>,
        value: &Value,
        data_type: &ExpandedNodeId,
    ) -> Result<(), EncodeError> {
        structure::write_struct(self, field, value, data_type)
    }

    fn write_struct_array(
        &mut self,
        field: Option<&str>,
        value: &Value,
        data_type: &ExpandedNodeId,
    ) -> Result<(), EncodeError> {
        structure::write_struct_array(self, field, value, data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryEncoder;
    use crate::context::EncodingContext;
    use crate::encoding::{BinaryDecoder, Decoder, Encoder};
    use crate::registry::DataTypeRegistry;
    use crate::types::{
        ByteString, ExpandedNodeId, Guid, Identifier, LocalizedText, NamespaceTable, NodeId,
        QualifiedName, UaString,
    };
    use crate::EncodeError;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn ctx() -> EncodingContext {
        let registry = DataTypeRegistry::builder(NamespaceTable::new()).build().unwrap();
        EncodingContext::for_registry(Arc::new(registry))
    }

    #[test]
    fn node_id_uses_smallest_encoding() {
        let mut buf = [0u8; 32];
        let mut e = BinaryEncoder::new(ctx(), &mut buf);
        e.write_node_id(None, &NodeId::numeric(0, 42)).unwrap();
        e.write_node_id(None, &NodeId::numeric(5, 10_000)).unwrap();
        e.write_node_id(None, &NodeId::numeric(256, 1)).unwrap();
        assert_eq!(
            e.as_written(),
            &[0x00, 0x2A, 0x01, 0x05, 0x10, 0x27, 0x02, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn extension_object_length_is_patched() {
        let mut buf = [0u8; 32];
        let mut e = BinaryEncoder::new(ctx(), &mut buf);
        e.begin_extension_object(None, &NodeId::numeric(0, 16), "T")
            .unwrap();
        e.write_uint16(None, 0xBEEF).unwrap();
        e.end_extension_object().unwrap();
        assert_eq!(e.as_written(), &[0x00, 0x10, 0x01, 2, 0, 0, 0, 0xEF, 0xBE]);
    }

    #[test]
    fn null_extension_object() {
        let mut buf = [0u8; 4];
        let mut e = BinaryEncoder::new(ctx(), &mut buf);
        e.write_null_extension_object(None).unwrap();
        assert_eq!(e.as_written(), &[0x00, 0x00, 0x00]);
    }

    #[test]
    fn buffer_too_small() {
        let mut buf = [0u8; 3];
        let mut e = BinaryEncoder::new(ctx(), &mut buf);
        assert_eq!(
            e.write_string(None, &UaString::from("x")).unwrap_err(),
            EncodeError::BufferTooSmall
        );
    }

    #[test]
    fn composite_builtins_roundtrip() {
        let guid = Guid::from_fields(0x7240_2A4E, 0x1A2B, 0x3C4D, [1, 2, 3, 4, 5, 6, 7, 8]);
        let expanded = ExpandedNodeId {
            namespace: crate::types::NamespaceRef::Uri("urn:x".into()),
            identifier: Identifier::Guid(guid),
            server_index: 3,
        };
        let qn = QualifiedName::new(2, "Name");
        let lt = LocalizedText::new(UaString::null(), "only text");

        let mut buf = [0u8; 256];
        let mut e = BinaryEncoder::new(ctx(), &mut buf);
        e.write_guid(None, &guid).unwrap();
        e.write_expanded_node_id(None, &expanded).unwrap();
        e.write_qualified_name(None, &qn).unwrap();
        e.write_localized_text(None, &lt).unwrap();
        e.write_byte_string(None, &ByteString::null()).unwrap();
        e.write_node_id(None, &NodeId::opaque(1, vec![9, 9])).unwrap();
        let len = e.position();

        let mut d = BinaryDecoder::new(ctx(), &buf[..len]);
        assert_eq!(d.read_guid(None).unwrap(), guid);
        assert_eq!(d.read_expanded_node_id(None).unwrap(), expanded);
        assert_eq!(d.read_qualified_name(None).unwrap(), qn);
        assert_eq!(d.read_localized_text(None).unwrap(), lt);
        assert!(d.read_byte_string(None).unwrap().is_null());
        assert_eq!(d.read_node_id(None).unwrap(), NodeId::opaque(1, vec![9, 9]));
        assert!(d.is_empty());
    }

    proptest! {
        #[test]
        fn integers_roundtrip(a in any::<i64>(), b in any::<u64>(), c in any::<i16>(), f in any::<f64>()) {
            let mut buf = [0u8; 32];
            let mut e = BinaryEncoder::new(ctx(), &mut buf);
            e.write_int64(None, a).unwrap();
            e.write_uint64(None, b).unwrap();
            e.write_int16(None, c).unwrap();
            e.write_double(None, f).unwrap();
            let len = e.position();

            let mut d = BinaryDecoder::new(ctx(), &buf[..len]);
            prop_assert_eq!(d.read_int64(None).unwrap(), a);
            prop_assert_eq!(d.read_uint64(None).unwrap(), b);
            prop_assert_eq!(d.read_int16(None).unwrap(), c);
            prop_assert_eq!(d.read_double(None).unwrap().to_bits(), f.to_bits());
        }
    }
}

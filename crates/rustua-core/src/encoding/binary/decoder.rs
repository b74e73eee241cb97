use super::reader::Reader;
use super::{
    BODY_BINARY, BODY_NONE, BODY_XML, LOCALIZED_TEXT_LOCALE, LOCALIZED_TEXT_TEXT,
    NAMESPACE_URI_FLAG, NODE_ID_FOUR_BYTE, NODE_ID_GUID, NODE_ID_NUMERIC, NODE_ID_OPAQUE,
    NODE_ID_STRING, NODE_ID_TWO_BYTE, NODE_ID_TYPE_MASK, SERVER_INDEX_FLAG,
};
use crate::context::EncodingContext;
use crate::encoding::Decoder;
use crate::structure;
use crate::types::{
    ByteString, DateTime, ExpandedNodeId, Guid, Identifier, LocalizedText, NamespaceRef, NodeId,
    QualifiedName, StatusCode, UaString, Value, WireFormat, XmlElement,
};
use crate::DecodeError;

/// Reads the OPC UA binary encoding from a borrowed buffer.
#[derive(Debug)]
pub struct BinaryDecoder<'a> {
    ctx: EncodingContext,
    reader: Reader<'a>,
    depth: usize,
    /// End offsets of the extension-object bodies currently open.
    bodies: Vec<usize>,
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(ctx: EncodingContext, buf: &'a [u8]) -> Self {
        Self {
            ctx,
            reader: Reader::new(buf),
            depth: 0,
            bodies: Vec::new(),
        }
    }

    /// Starts over on a new buffer, keeping the context.
    pub fn reset(&mut self, buf: &'a [u8]) {
        self.reader = Reader::new(buf);
        self.depth = 0;
        self.bodies.clear();
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Bytes left after the read position.
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// True once the whole buffer has been consumed.
    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        let limit = self.ctx.limits().max_depth;
        if self.depth >= limit {
            return Err(DecodeError::LimitExceeded {
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

    fn read_length(
        &mut self,
        what: &'static str,
        limit: usize,
    ) -> Result<Option<usize>, DecodeError> {
        let len = self.reader.read_le_i32()?;
        if len == -1 {
            return Ok(None);
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(i64::from(len)))?;
        if len > limit {
            return Err(DecodeError::LimitExceeded { what, limit });
        }
        Ok(Some(len))
    }

    fn read_bytes(&mut self, what: &'static str, limit: usize) -> Result<Option<&'a [u8]>, DecodeError> {
        match self.read_length(what, limit)? {
            Some(len) => self.reader.read_exact(len).map(Some),
            None => Ok(None),
        }
    }

    fn read_text(&mut self, kind: &'static str) -> Result<Option<String>, DecodeError> {
        let limit = self.ctx.limits().max_string_length;
        let Some(bytes) = self.read_bytes("string length", limit)? else {
            return Ok(None);
        };
        core::str::from_utf8(bytes)
            .map(|s| Some(s.to_owned()))
            .map_err(|err| DecodeError::malformed(kind, err.to_string()))
    }

    fn read_opaque(&mut self) -> Result<Option<Vec<u8>>, DecodeError> {
        let limit = self.ctx.limits().max_byte_string_length;
        Ok(self.read_bytes("byte string length", limit)?.map(<[u8]>::to_vec))
    }

    fn read_node_id_body(&mut self, encoding: u8) -> Result<NodeId, DecodeError> {
        let (namespace, identifier) = match encoding & NODE_ID_TYPE_MASK {
            NODE_ID_TWO_BYTE => (0, Identifier::Numeric(u32::from(self.reader.read_u8()?))),
            NODE_ID_FOUR_BYTE => {
                let ns = u16::from(self.reader.read_u8()?);
                (ns, Identifier::Numeric(u32::from(self.reader.read_le_u16()?)))
            }
            NODE_ID_NUMERIC => {
                let ns = self.reader.read_le_u16()?;
                (ns, Identifier::Numeric(self.reader.read_le_u32()?))
            }
            NODE_ID_STRING => {
                let ns = self.reader.read_le_u16()?;
                (ns, Identifier::String(self.read_text("NodeId")?.unwrap_or_default()))
            }
            NODE_ID_GUID => {
                let ns = self.reader.read_le_u16()?;
                (ns, Identifier::Guid(self.read_guid(None)?))
            }
            NODE_ID_OPAQUE => {
                let ns = self.reader.read_le_u16()?;
                (ns, Identifier::Opaque(self.read_opaque()?.unwrap_or_default()))
            }
            other => {
                return Err(DecodeError::malformed(
                    "NodeId",
                    format!("unknown encoding byte 0x{other:02X}"),
                ))
            }
        };
        Ok(NodeId {
            namespace,
            identifier,
        })
    }
}

impl<'a> Decoder for BinaryDecoder<'a> {
    fn context(&self) -> &EncodingContext {
        &self.ctx
    }

    fn format(&self) -> WireFormat {
        WireFormat::Binary
    }

    fn read_boolean(&mut self, _field: Option<&str>) -> Result<bool, DecodeError> {
        Ok(self.reader.read_u8()? != 0)
    }

    fn read_sbyte(&mut self, _field: Option<&str>) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes([self.reader.read_u8()?]))
    }

    fn read_byte(&mut self, _field: Option<&str>) -> Result<u8, DecodeError> {
        self.reader.read_u8()
    }

    fn read_int16(&mut self, _field: Option<&str>) -> Result<i16, DecodeError> {
        self.reader.read_le_i16()
    }

    fn read_uint16(&mut self, _field: Option<&str>) -> Result<u16, DecodeError> {
        self.reader.read_le_u16()
    }

    fn read_int32(&mut self, _field: Option<&str>) -> Result<i32, DecodeError> {
        self.reader.read_le_i32()
    }

    fn read_uint32(&mut self, _field: Option<&str>) -> Result<u32, DecodeError> {
        self.reader.read_le_u32()
    }

    fn read_int64(&mut self, _field: Option<&str>) -> Result<i64, DecodeError> {
        self.reader.read_le_i64()
    }

    fn read_uint64(&mut self, _field: Option<&str>) -> Result<u64, DecodeError> {
        self.reader.read_le_u64()
    }

    fn read_float(&mut self, _field: Option<&str>) -> Result<f32, DecodeError> {
        self.reader.read_le_f32()
    }

    fn read_double(&mut self, _field: Option<&str>) -> Result<f64, DecodeError> {
        self.reader.read_le_f64()
    }

    fn read_string(&mut self, _field: Option<&str>) -> Result<UaString, DecodeError> {
        Ok(self.read_text("String")?.into())
    }

    fn read_date_time(&mut self, _field: Option<&str>) -> Result<DateTime, DecodeError> {
        Ok(DateTime::from_ticks(self.reader.read_le_i64()?))
    }

    fn read_guid(&mut self, _field: Option<&str>) -> Result<Guid, DecodeError> {
        let data1 = self.reader.read_le_u32()?;
        let data2 = self.reader.read_le_u16()?;
        let data3 = self.reader.read_le_u16()?;
        let data4 = self.reader.read_array::<8>()?;
        Ok(Guid::from_fields(data1, data2, data3, data4))
    }

    fn read_byte_string(&mut self, _field: Option<&str>) -> Result<ByteString, DecodeError> {
        Ok(match self.read_opaque()? {
            Some(bytes) => ByteString::new(bytes),
            None => ByteString::null(),
        })
    }

    fn read_xml_element(&mut self, _field: Option<&str>) -> Result<XmlElement, DecodeError> {
        Ok(self.read_text("XmlElement")?.into())
    }

    fn read_node_id(&mut self, _field: Option<&str>) -> Result<NodeId, DecodeError> {
        let encoding = self.reader.read_u8()?;
        if encoding & !NODE_ID_TYPE_MASK != 0 {
            return Err(DecodeError::malformed(
                "NodeId",
                format!("expanded flags 0x{encoding:02X} on a plain node id"),
            ));
        }
        self.read_node_id_body(encoding)
    }

    fn read_expanded_node_id(
        &mut self,
        _field: Option<&str>,
    ) -> Result<ExpandedNodeId, DecodeError> {
        let encoding = self.reader.read_u8()?;
        let node_id = self.read_node_id_body(encoding)?;
        let namespace = if encoding & NAMESPACE_URI_FLAG != 0 {
            match self.read_text("ExpandedNodeId")? {
                Some(uri) => NamespaceRef::Uri(uri),
                None => NamespaceRef::Index(node_id.namespace),
            }
        } else {
            NamespaceRef::Index(node_id.namespace)
        };
        let server_index = if encoding & SERVER_INDEX_FLAG != 0 {
            self.reader.read_le_u32()?
        } else {
            0
        };
        Ok(ExpandedNodeId {
            namespace,
            identifier: node_id.identifier,
            server_index,
        })
    }

    fn read_status_code(&mut self, _field: Option<&str>) -> Result<StatusCode, DecodeError> {
        Ok(StatusCode::new(self.reader.read_le_u32()?))
    }

    fn read_qualified_name(&mut self, _field: Option<&str>) -> Result<QualifiedName, DecodeError> {
        let namespace_index = self.reader.read_le_u16()?;
        let name = self.read_text("QualifiedName")?;
        Ok(QualifiedName::new(namespace_index, name))
    }

    fn read_localized_text(&mut self, _field: Option<&str>) -> Result<LocalizedText, DecodeError> {
        let mask = self.reader.read_u8()?;
        let locale = if mask & LOCALIZED_TEXT_LOCALE != 0 {
            self.read_text("LocalizedText")?
        } else {
            None
        };
        let text = if mask & LOCALIZED_TEXT_TEXT != 0 {
            self.read_text("LocalizedText")?
        } else {
            None
        };
        Ok(LocalizedText::new(locale, text))
    }

    fn read_enumeration(&mut self, _field: Option<&str>) -> Result<i32, DecodeError> {
        self.reader.read_le_i32()
    }

    fn read_optional_mask(&mut self, _optional_fields: &[&str]) -> Result<u32, DecodeError> {
        self.reader.read_le_u32()
    }

    fn begin_struct(&mut self, _field: Option<&str>) -> Result<(), DecodeError> {
        self.enter()
    }

    fn end_struct(&mut self) -> Result<(), DecodeError> {
        self.leave();
        Ok(())
    }

    fn begin_array(&mut self, _field: Option<&str>) -> Result<Option<usize>, DecodeError> {
        let len = self.read_length("array length", self.ctx.limits().max_array_length)?;
        if len.is_some() {
            self.enter()?;
        }
        Ok(len)
    }

    fn end_array(&mut self) -> Result<(), DecodeError> {
        self.leave();
        Ok(())
    }

    fn begin_extension_object(
        &mut self,
        _field: Option<&str>,
    ) -> Result<Option<NodeId>, DecodeError> {
        let type_id = self.read_node_id(None)?;
        match self.reader.read_u8()? {
            BODY_NONE => Ok(None),
            BODY_BINARY => {
                let len = self.reader.read_le_i32()?;
                let len = usize::try_from(len)
                    .map_err(|_| DecodeError::InvalidLength(i64::from(len)))?;
                if len > self.reader.remaining() {
                    return Err(DecodeError::UnexpectedEof);
                }
                self.enter()?;
                self.bodies.push(self.reader.position() + len);
                Ok(Some(type_id))
            }
            BODY_XML => Err(DecodeError::Unsupported(
                "XML-bodied extension object in a binary stream",
            )),
            other => Err(DecodeError::malformed(
                "ExtensionObject",
                format!("unknown body encoding 0x{other:02X}"),
            )),
        }
    }

    fn end_extension_object(&mut self) -> Result<(), DecodeError> {
        let end = self
            .bodies
            .pop()
            .ok_or(DecodeError::InvalidState("no open extension object"))?;
        let position = self.reader.position();
        if position != end {
            log::debug!("extension object body ended at {position}, declared end {end}");
            return Err(DecodeError::InvalidLength(
                i64::try_from(end).unwrap_or(i64::MAX),
            ));
        }
        self.leave();
        Ok(())
    }

    fn read_struct(
        &mut self,
        field: Option<&str>,
        data_type: &ExpandedNodeId,
    ) -> Result<Value, DecodeError> {
        structure::read_struct(self, field, data_type)
    }

    fn read_struct_array(
        &mut self,
        field: Option<&str>,
        data_type: &ExpandedNodeId,
    ) -> Result<Value, DecodeError> {
        structure::read_struct_array(self, field, data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryDecoder;
    use crate::context::EncodingContext;
    use crate::encoding::Decoder;
    use crate::registry::DataTypeRegistry;
    use crate::types::{
        ExpandedNodeId, Identifier, NamespaceRef, NamespaceTable, NodeId, UaString,
    };
    use crate::{DecodeError, EncodingLimits};
    use std::sync::Arc;

    fn ctx() -> EncodingContext {
        let registry = DataTypeRegistry::builder(NamespaceTable::new()).build().unwrap();
        EncodingContext::for_registry(Arc::new(registry))
    }

    #[test]
    fn string_null_and_empty_are_distinct() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 2, 0, 0, 0, b'h', b'i'];
        let mut d = BinaryDecoder::new(ctx(), &bytes);
        assert_eq!(d.read_string(None).unwrap(), UaString::null());
        assert_eq!(d.read_string(None).unwrap(), UaString::from(""));
        assert_eq!(d.read_string(None).unwrap(), UaString::from("hi"));
        assert!(d.is_empty());
    }

    #[test]
    fn negative_length_other_than_null_is_invalid() {
        let bytes = (-2i32).to_le_bytes();
        let mut d = BinaryDecoder::new(ctx(), &bytes);
        assert_eq!(d.read_string(None).unwrap_err(), DecodeError::InvalidLength(-2));
    }

    #[test]
    fn string_limit_enforced() {
        let ctx = ctx().with_limits(EncodingLimits::default().with_max_string_length(1));
        let bytes = [2, 0, 0, 0, b'h', b'i'];
        let mut d = BinaryDecoder::new(ctx, &bytes);
        assert!(matches!(
            d.read_string(None),
            Err(DecodeError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn node_id_encodings() {
        let bytes = [
            0x00, 0x2A, // two-byte
            0x01, 0x05, 0x10, 0x27, // four-byte ns=5;i=10000
            0x02, 0x00, 0x01, 0xA0, 0x86, 0x01, 0x00, // ns=256;i=100000
            0x03, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, b'x', // ns=1;s=x
        ];
        let mut d = BinaryDecoder::new(ctx(), &bytes);
        assert_eq!(d.read_node_id(None).unwrap(), NodeId::numeric(0, 42));
        assert_eq!(d.read_node_id(None).unwrap(), NodeId::numeric(5, 10_000));
        assert_eq!(d.read_node_id(None).unwrap(), NodeId::numeric(256, 100_000));
        assert_eq!(d.read_node_id(None).unwrap(), NodeId::string(1, "x"));
    }

    #[test]
    fn expanded_node_id_with_uri_and_server() {
        let mut bytes = vec![0xC0, 0x07];
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.extend_from_slice(b"urn");
        bytes.extend_from_slice(&2u32.to_le_bytes());
        let mut d = BinaryDecoder::new(ctx(), &bytes);
        let id = d.read_expanded_node_id(None).unwrap();
        assert_eq!(
            id,
            ExpandedNodeId {
                namespace: NamespaceRef::Uri("urn".into()),
                identifier: Identifier::Numeric(7),
                server_index: 2,
            }
        );
    }

    #[test]
    fn extension_object_length_is_checked() {
        // binary body declared 4 bytes, body consumes 2
        let bytes = [0x01, 0x00, 0x10, 0x00, 0x01, 4, 0, 0, 0, 1, 2, 3, 4];
        let mut d = BinaryDecoder::new(ctx(), &bytes);
        assert_eq!(
            d.begin_extension_object(None).unwrap(),
            Some(NodeId::numeric(0, 16))
        );
        d.read_uint16(None).unwrap();
        assert!(matches!(
            d.end_extension_object(),
            Err(DecodeError::InvalidLength(_))
        ));
    }

    #[test]
    fn extension_object_body_beyond_buffer() {
        let bytes = [0x00, 0x10, 0x01, 9, 0, 0, 0, 1];
        let mut d = BinaryDecoder::new(ctx(), &bytes);
        assert_eq!(
            d.begin_extension_object(None).unwrap_err(),
            DecodeError::UnexpectedEof
        );
    }

    #[test]
    fn xml_body_unsupported() {
        let bytes = [0x00, 0x10, 0x02, 0, 0, 0, 0];
        let mut d = BinaryDecoder::new(ctx(), &bytes);
        assert!(matches!(
            d.begin_extension_object(None),
            Err(DecodeError::Unsupported(_))
        ));
    }

    #[test]
    fn depth_limit() {
        let ctx = ctx().with_limits(EncodingLimits::default().with_max_depth(1));
        let mut d = BinaryDecoder::new(ctx, &[]);
        d.begin_struct(None).unwrap();
        assert!(matches!(
            d.begin_struct(None),
            Err(DecodeError::LimitExceeded { .. })
        ));
    }
}

use super::tree::XmlNode;
use super::{tree_depth_limit, BODY, IDENTIFIER, INFINITY, NAN, NEG_INFINITY, TYPE_ID};
use crate::context::EncodingContext;
use crate::encoding::literal::{narrow_f32, parse_enumeration, parse_integer};
use crate::encoding::Decoder;
use crate::structure;
use crate::types::{
    ByteString, DateTime, ExpandedNodeId, Guid, LocalizedText, NodeId, QualifiedName,
    StatusCode, UaString, Value, WireFormat, XmlElement,
};
use crate::DecodeError;
use core::num::ParseIntError;
use core::str::FromStr;
use std::collections::VecDeque;

fn parse_float(text: &str, kind: &'static str) -> Result<f64, DecodeError> {
    match text.trim() {
        INFINITY => Ok(f64::INFINITY),
        NEG_INFINITY => Ok(f64::NEG_INFINITY),
        NAN => Ok(f64::NAN),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DecodeError::malformed(kind, format!("'{other}'"))),
    }
}

fn child_text(node: &XmlNode, name: &str) -> Option<UaString> {
    node.child(name)
        .map(|c| if c.nil { UaString::null() } else { UaString::new(c.text.clone()) })
}

/// Reads the OPC UA XML encoding from a parsed element tree.
///
/// Each open structure is a queue of its remaining child elements. A named
/// read removes the first child with that name; an unnamed read takes the
/// next child in document order.
#[derive(Debug)]
pub struct XmlDecoder {
    ctx: EncodingContext,
    root: Option<XmlNode>,
    stack: Vec<VecDeque<XmlNode>>,
}

impl XmlDecoder {
    pub fn new(ctx: EncodingContext) -> Self {
        Self {
            ctx,
            root: None,
            stack: Vec::new(),
        }
    }

    /// Parses `text` and positions the decoder before its root element.
    pub fn parse(ctx: EncodingContext, text: &str) -> Result<Self, DecodeError> {
        let mut decoder = Self::new(ctx);
        decoder.reset(text)?;
        Ok(decoder)
    }

    /// Replaces the document, discarding any read position.
    pub fn reset(&mut self, text: &str) -> Result<(), DecodeError> {
        let limits = self.ctx.limits();
        if text.len() > limits.max_message_size {
            return Err(DecodeError::LimitExceeded {
                what: "message size",
                limit: limits.max_message_size,
            });
        }
        let root = XmlNode::parse(text, tree_depth_limit(limits.max_depth))?;
        self.reset_node(root);
        Ok(())
    }

    /// Restarts on an element tree that is already built.
    pub fn reset_node(&mut self, root: XmlNode) {
        self.root = Some(root);
        self.stack.clear();
    }

    fn take(&mut self, field: Option<&str>) -> Result<XmlNode, DecodeError> {
        match (self.stack.last_mut(), field) {
            (Some(children), Some(name)) => children
                .iter()
                .position(|c| c.name == name)
                .and_then(|i| children.remove(i))
                .ok_or_else(|| DecodeError::MissingField(name.to_owned())),
            (Some(children), None) => children.pop_front().ok_or(DecodeError::UnexpectedEof),
            (None, _) => self.root.take().ok_or(DecodeError::UnexpectedEof),
        }
    }

    fn push(&mut self, children: Vec<XmlNode>) -> Result<(), DecodeError> {
        let limit = self.ctx.limits().max_depth;
        if self.stack.len() >= limit {
            return Err(DecodeError::LimitExceeded {
                what: "nesting depth",
                limit,
            });
        }
        self.stack.push(children.into());
        Ok(())
    }

    fn take_text(&mut self, field: Option<&str>, kind: &'static str) -> Result<String, DecodeError> {
        let node = self.take(field)?;
        if node.nil {
            return Err(DecodeError::malformed(kind, "nil value"));
        }
        Ok(node.text)
    }

    fn take_nullable_text(&mut self, field: Option<&str>) -> Result<Option<String>, DecodeError> {
        let node = self.take(field)?;
        Ok((!node.nil).then_some(node.text))
    }

    fn take_bounded_text(&mut self, field: Option<&str>) -> Result<Option<String>, DecodeError> {
        let text = self.take_nullable_text(field)?;
        let limit = self.ctx.limits().max_string_length;
        if text.as_ref().is_some_and(|t| t.len() > limit) {
            return Err(DecodeError::LimitExceeded {
                what: "string length",
                limit,
            });
        }
        Ok(text)
    }

    fn read_parsed<T>(&mut self, field: Option<&str>, kind: &'static str) -> Result<T, DecodeError>
    where
        T: FromStr<Err = ParseIntError>,
    {
        parse_integer(&self.take_text(field, kind)?, kind)
    }

    fn read_node_id_text(&mut self, field: Option<&str>) -> Result<Option<String>, DecodeError> {
        let node = self.take(field)?;
        if node.nil {
            return Ok(None);
        }
        Ok(identifier_text(&node))
    }
}

/// Text of the `<Identifier>` child; absent or blank means the null id.
fn identifier_text(node: &XmlNode) -> Option<String> {
    node.child(IDENTIFIER)
        .map(|c| c.text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

impl Decoder for XmlDecoder {
    fn context(&self) -> &EncodingContext {
        &self.ctx
    }

    fn format(&self) -> WireFormat {
        WireFormat::Xml
    }

    fn read_boolean(&mut self, field: Option<&str>) -> Result<bool, DecodeError> {
        match self.take_text(field, "Boolean")?.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(DecodeError::malformed("Boolean", format!("'{other}'"))),
        }
    }

    fn read_sbyte(&mut self, field: Option<&str>) -> Result<i8, DecodeError> {
        self.read_parsed(field, "SByte")
    }

    fn read_byte(&mut self, field: Option<&str>) -> Result<u8, DecodeError> {
        self.read_parsed(field, "Byte")
    }

    fn read_int16(&mut self, field: Option<&str>) -> Result<i16, DecodeError> {
        self.read_parsed(field, "Int16")
    }

    fn read_uint16(&mut self, field: Option<&str>) -> Result<u16, DecodeError> {
        self.read_parsed(field, "UInt16")
    }

    fn read_int32(&mut self, field: Option<&str>) -> Result<i32, DecodeError> {
        self.read_parsed(field, "Int32")
    }

    fn read_uint32(&mut self, field: Option<&str>) -> Result<u32, DecodeError> {
        self.read_parsed(field, "UInt32")
    }

    fn read_int64(&mut self, field: Option<&str>) -> Result<i64, DecodeError> {
        self.read_parsed(field, "Int64")
    }

    fn read_uint64(&mut self, field: Option<&str>) -> Result<u64, DecodeError> {
        self.read_parsed(field, "UInt64")
    }

    fn read_float(&mut self, field: Option<&str>) -> Result<f32, DecodeError> {
        let text = self.take_text(field, "Float")?;
        narrow_f32(parse_float(&text, "Float")?, text.trim())
    }

    fn read_double(&mut self, field: Option<&str>) -> Result<f64, DecodeError> {
        parse_float(&self.take_text(field, "Double")?, "Double")
    }

    fn read_string(&mut self, field: Option<&str>) -> Result<UaString, DecodeError> {
        Ok(self.take_bounded_text(field)?.into())
    }

    fn read_date_time(&mut self, field: Option<&str>) -> Result<DateTime, DecodeError> {
        DateTime::parse_iso8601(self.take_text(field, "DateTime")?.trim())
    }

    fn read_guid(&mut self, field: Option<&str>) -> Result<Guid, DecodeError> {
        let node = self.take(field)?;
        match node.child("String") {
            Some(inner) => Guid::parse(inner.text.trim()),
            None => Err(DecodeError::MissingField("String".to_owned())),
        }
    }

    fn read_byte_string(&mut self, field: Option<&str>) -> Result<ByteString, DecodeError> {
        match self.take_nullable_text(field)? {
            Some(text) => {
                let compact: String = text.split_whitespace().collect();
                let bytes = ByteString::from_base64(&compact)?;
                let limit = self.ctx.limits().max_byte_string_length;
                if bytes.len() > limit {
                    return Err(DecodeError::LimitExceeded {
                        what: "byte string length",
                        limit,
                    });
                }
                Ok(bytes)
            }
            None => Ok(ByteString::null()),
        }
    }

    fn read_xml_element(&mut self, field: Option<&str>) -> Result<XmlElement, DecodeError> {
        Ok(self.take_bounded_text(field)?.into())
    }

    fn read_node_id(&mut self, field: Option<&str>) -> Result<NodeId, DecodeError> {
        match self.read_node_id_text(field)? {
            Some(text) => text.parse(),
            None => Ok(NodeId::NULL),
        }
    }

    fn read_expanded_node_id(
        &mut self,
        field: Option<&str>,
    ) -> Result<ExpandedNodeId, DecodeError> {
        match self.read_node_id_text(field)? {
            Some(text) => text.parse(),
            None => Ok(ExpandedNodeId::default()),
        }
    }

    fn read_status_code(&mut self, field: Option<&str>) -> Result<StatusCode, DecodeError> {
        let node = self.take(field)?;
        let code = match node.child("Code") {
            Some(inner) => parse_integer(&inner.text, "StatusCode")?,
            None => 0,
        };
        Ok(StatusCode::new(code))
    }

    fn read_qualified_name(&mut self, field: Option<&str>) -> Result<QualifiedName, DecodeError> {
        let node = self.take(field)?;
        if node.nil {
            return Ok(QualifiedName::default());
        }
        let namespace_index = match node.child("NamespaceIndex") {
            Some(inner) => parse_integer(&inner.text, "QualifiedName")?,
            None => 0,
        };
        let name = child_text(&node, "Name").unwrap_or_default();
        Ok(QualifiedName::new(namespace_index, name))
    }

    fn read_localized_text(&mut self, field: Option<&str>) -> Result<LocalizedText, DecodeError> {
        let node = self.take(field)?;
        if node.nil {
            return Ok(LocalizedText::NULL);
        }
        Ok(LocalizedText::new(
            child_text(&node, "Locale").unwrap_or_default(),
            child_text(&node, "Text").unwrap_or_default(),
        ))
    }

    fn read_enumeration(&mut self, field: Option<&str>) -> Result<i32, DecodeError> {
        parse_enumeration(&self.take_text(field, "Enumeration")?)
    }

    fn read_optional_mask(&mut self, optional_fields: &[&str]) -> Result<u32, DecodeError> {
        let children = self
            .stack
            .last()
            .ok_or(DecodeError::InvalidState("optional mask outside an element"))?;
        Ok(optional_fields
            .iter()
            .enumerate()
            .filter(|(_, name)| children.iter().any(|c| c.name == **name))
            .fold(0, |mask, (bit, _)| mask | (1 << bit)))
    }

    fn begin_struct(&mut self, field: Option<&str>) -> Result<(), DecodeError> {
        let node = self.take(field)?;
        if node.nil {
            return Err(DecodeError::malformed("Structure", "nil value"));
        }
        self.push(node.children)
    }

    fn end_struct(&mut self) -> Result<(), DecodeError> {
        self.stack
            .pop()
            .map(|_| ())
            .ok_or(DecodeError::InvalidState("end_struct without begin_struct"))
    }

    fn begin_array(&mut self, field: Option<&str>) -> Result<Option<usize>, DecodeError> {
        let node = self.take(field)?;
        if node.nil {
            return Ok(None);
        }
        let limit = self.ctx.limits().max_array_length;
        if node.children.len() > limit {
            return Err(DecodeError::LimitExceeded {
                what: "array length",
                limit,
            });
        }
        let len = node.children.len();
        self.push(node.children)?;
        Ok(Some(len))
    }

    fn end_array(&mut self) -> Result<(), DecodeError> {
        self.stack
            .pop()
            .map(|_| ())
            .ok_or(DecodeError::InvalidState("end_array without begin_array"))
    }

    fn begin_extension_object(
        &mut self,
        field: Option<&str>,
    ) -> Result<Option<NodeId>, DecodeError> {
        let node = self.take(field)?;
        if node.nil {
            return Ok(None);
        }
        let type_id: NodeId = match node.child(TYPE_ID) {
            Some(type_id) => match identifier_text(type_id) {
                Some(text) => text.parse()?,
                None => NodeId::NULL,
            },
            None => return Err(DecodeError::MissingField(TYPE_ID.to_owned())),
        };
        let mut children = node.children;
        let body = children
            .iter()
            .position(|c| c.name == BODY)
            .map(|i| children.swap_remove(i));
        match body {
            Some(body) => {
                let inner = body.children.into_iter().next().ok_or_else(|| {
                    DecodeError::malformed("ExtensionObject", "empty body")
                })?;
                self.push(inner.children)?;
                Ok(Some(type_id))
            }
            None if type_id.is_null() => Ok(None),
            None => Err(DecodeError::MissingField(BODY.to_owned())),
        }
    }

    fn end_extension_object(&mut self) -> Result<(), DecodeError> {
        self.stack.pop().map(|_| ()).ok_or(DecodeError::InvalidState(
            "end_extension_object without begin_extension_object",
        ))
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

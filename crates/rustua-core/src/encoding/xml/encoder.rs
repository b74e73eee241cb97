use super::tree::XmlNode;
use super::{BODY, EXTENSION_OBJECT, IDENTIFIER, INFINITY, NAN, NEG_INFINITY, TYPE_ID, UNNAMED_ARRAY};
use crate::context::EncodingContext;
use crate::encoding::Encoder;
use crate::structure;
use crate::types::{
    BuiltinType, ByteString, DateTime, ExpandedNodeId, Guid, LocalizedText, NodeId,
    QualifiedName, StatusCode, UaString, Value, WireFormat, XmlElement,
};
use crate::EncodeError;
use core::fmt::{Display, LowerExp};

fn float_text<T: Display + LowerExp>(value: T, magnitude: f64) -> String {
    if magnitude.is_nan() {
        NAN.to_owned()
    } else if magnitude == f64::INFINITY {
        INFINITY.to_owned()
    } else if magnitude == f64::NEG_INFINITY {
        NEG_INFINITY.to_owned()
    } else if magnitude == 0.0 || (1e-6..1e15).contains(&magnitude.abs()) {
        value.to_string()
    } else {
        format!("{value:e}")
    }
}

fn text_or_nil(name: &str, text: Option<&str>) -> XmlNode {
    text.map_or_else(|| XmlNode::nil(name), |t| XmlNode::leaf(name, t))
}

fn node_id_element(name: &str, identifier: String) -> XmlNode {
    XmlNode::new(name).with_child(XmlNode::leaf(IDENTIFIER, identifier))
}

/// Builds an OPC UA XML document as an element tree.
#[derive(Debug)]
pub struct XmlEncoder {
    ctx: EncodingContext,
    root: Option<XmlNode>,
    stack: Vec<XmlNode>,
    depth: usize,
}

impl XmlEncoder {
    pub fn new(ctx: EncodingContext) -> Self {
        Self {
            ctx,
            root: None,
            stack: Vec::new(),
            depth: 0,
        }
    }

    pub fn reset(&mut self) {
        self.root = None;
        self.stack.clear();
        self.depth = 0;
    }

    /// Takes the finished root element, leaving the encoder empty.
    pub fn finish(&mut self) -> Result<XmlNode, EncodeError> {
        if !self.stack.is_empty() {
            return Err(EncodeError::InvalidState("unclosed element"));
        }
        self.root
            .take()
            .ok_or(EncodeError::InvalidState("nothing was written"))
    }

    /// Serializes the finished document, checking the message size limit.
    pub fn finish_string(&mut self) -> Result<String, EncodeError> {
        let text = self.finish()?.to_document_string();
        let limit = self.ctx.limits().max_message_size;
        if text.len() > limit {
            return Err(EncodeError::LimitExceeded {
                what: "message size",
                limit,
            });
        }
        Ok(text)
    }

    fn put(&mut self, node: XmlNode) -> Result<(), EncodeError> {
        if let Some(c) = node.invalid_char() {
            return Err(EncodeError::InvalidCharacter(c));
        }
        self.attach(node)
    }

    fn attach(&mut self, node: XmlNode) -> Result<(), EncodeError> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(node);
                Ok(())
            }
            None if self.root.is_none() => {
                self.root = Some(node);
                Ok(())
            }
            None => Err(EncodeError::InvalidState("document already has a root element")),
        }
    }

    fn put_leaf(&mut self, field: Option<&str>, kind: BuiltinType, text: String) -> Result<(), EncodeError> {
        self.put(XmlNode::leaf(field.unwrap_or(kind.name()), text))
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

    fn close(&mut self) -> Result<(), EncodeError> {
        let node = self
            .stack
            .pop()
            .ok_or(EncodeError::InvalidState("close without open"))?;
        self.attach(node)
    }
}

impl Encoder for XmlEncoder {
    fn context(&self) -> &EncodingContext {
        &self.ctx
    }

    fn format(&self) -> WireFormat {
        WireFormat::Xml
    }

    fn write_boolean(&mut self, field: Option<&str>, value: bool) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Boolean, value.to_string())
    }

    fn write_sbyte(&mut self, field: Option<&str>, value: i8) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::SByte, value.to_string())
    }

    fn write_byte(&mut self, field: Option<&str>, value: u8) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Byte, value.to_string())
    }

    fn write_int16(&mut self, field: Option<&str>, value: i16) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Int16, value.to_string())
    }

    fn write_uint16(&mut self, field: Option<&str>, value: u16) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::UInt16, value.to_string())
    }

    fn write_int32(&mut self, field: Option<&str>, value: i32) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Int32, value.to_string())
    }

    fn write_uint32(&mut self, field: Option<&str>, value: u32) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::UInt32, value.to_string())
    }

    fn write_int64(&mut self, field: Option<&str>, value: i64) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Int64, value.to_string())
    }

    fn write_uint64(&mut self, field: Option<&str>, value: u64) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::UInt64, value.to_string())
    }

    fn write_float(&mut self, field: Option<&str>, value: f32) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Float, float_text(value, f64::from(value)))
    }

    fn write_double(&mut self, field: Option<&str>, value: f64) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Double, float_text(value, value))
    }

    fn write_string(&mut self, field: Option<&str>, value: &UaString) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_string_length;
        if value.len() > limit {
            return Err(EncodeError::LimitExceeded {
                what: "string length",
                limit,
            });
        }
        self.put(text_or_nil(field.unwrap_or(BuiltinType::String.name()), value.as_str()))
    }

    fn write_date_time(&mut self, field: Option<&str>, value: DateTime) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::DateTime, value.to_iso8601())
    }

    fn write_guid(&mut self, field: Option<&str>, value: &Guid) -> Result<(), EncodeError> {
        self.put(
            XmlNode::new(field.unwrap_or(BuiltinType::Guid.name()))
                .with_child(XmlNode::leaf("String", value.to_string())),
        )
    }

    fn write_byte_string(
        &mut self,
        field: Option<&str>,
        value: &ByteString,
    ) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_byte_string_length;
        if value.len() > limit {
            return Err(EncodeError::LimitExceeded {
                what: "byte string length",
                limit,
            });
        }
        let name = field.unwrap_or(BuiltinType::ByteString.name());
        self.put(text_or_nil(name, value.to_base64().as_deref()))
    }

    fn write_xml_element(
        &mut self,
        field: Option<&str>,
        value: &XmlElement,
    ) -> Result<(), EncodeError> {
        self.put(text_or_nil(
            field.unwrap_or(BuiltinType::XmlElement.name()),
            value.fragment(),
        ))
    }

    fn write_node_id(&mut self, field: Option<&str>, value: &NodeId) -> Result<(), EncodeError> {
        self.put(node_id_element(
            field.unwrap_or(BuiltinType::NodeId.name()),
            value.to_string(),
        ))
    }

    fn write_expanded_node_id(
        &mut self,
        field: Option<&str>,
        value: &ExpandedNodeId,
    ) -> Result<(), EncodeError> {
        self.put(node_id_element(
            field.unwrap_or(BuiltinType::ExpandedNodeId.name()),
            value.to_string(),
        ))
    }

    fn write_status_code(
        &mut self,
        field: Option<&str>,
        value: StatusCode,
    ) -> Result<(), EncodeError> {
        self.put(
            XmlNode::new(field.unwrap_or(BuiltinType::StatusCode.name()))
                .with_child(XmlNode::leaf("Code", value.bits().to_string())),
        )
    }

    fn write_qualified_name(
        &mut self,
        field: Option<&str>,
        value: &QualifiedName,
    ) -> Result<(), EncodeError> {
        let mut node = XmlNode::new(field.unwrap_or(BuiltinType::QualifiedName.name()))
            .with_child(XmlNode::leaf(
                "NamespaceIndex",
                value.namespace_index.to_string(),
            ));
        if let Some(name) = value.name.as_str() {
            node.children.push(XmlNode::leaf("Name", name));
        }
        self.put(node)
    }

    fn write_localized_text(
        &mut self,
        field: Option<&str>,
        value: &LocalizedText,
    ) -> Result<(), EncodeError> {
        let mut node = XmlNode::new(field.unwrap_or(BuiltinType::LocalizedText.name()));
        if let Some(locale) = value.locale.as_str() {
            node.children.push(XmlNode::leaf("Locale", locale));
        }
        if let Some(text) = value.text.as_str() {
            node.children.push(XmlNode::leaf("Text", text));
        }
        self.put(node)
    }

    fn write_enumeration(&mut self, field: Option<&str>, value: i32) -> Result<(), EncodeError> {
        self.put_leaf(field, BuiltinType::Int32, value.to_string())
    }

    fn write_optional_mask(&mut self, _mask: u32) -> Result<(), EncodeError> {
        Ok(())
    }

    fn begin_struct(&mut self, field: Option<&str>, type_name: &str) -> Result<(), EncodeError> {
        self.enter()?;
        self.stack.push(XmlNode::new(field.unwrap_or(type_name)));
        Ok(())
    }

    fn end_struct(&mut self) -> Result<(), EncodeError> {
        self.leave();
        self.close()
    }

    fn begin_array(&mut self, field: Option<&str>, len: usize) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_array_length;
        if len > limit {
            return Err(EncodeError::LimitExceeded {
                what: "array length",
                limit,
            });
        }
        self.enter()?;
        let mut node = XmlNode::new(field.unwrap_or(UNNAMED_ARRAY));
        node.children.reserve(len.min(1024));
        self.stack.push(node);
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), EncodeError> {
        self.leave();
        self.close()
    }

    fn write_null_array(&mut self, field: Option<&str>) -> Result<(), EncodeError> {
        self.put(XmlNode::nil(field.unwrap_or(UNNAMED_ARRAY)))
    }

    fn begin_extension_object(
        &mut self,
        field: Option<&str>,
        encoding_id: &NodeId,
        type_name: &str,
    ) -> Result<(), EncodeError> {
        let envelope = XmlNode::new(field.unwrap_or(EXTENSION_OBJECT))
            .with_child(node_id_element(TYPE_ID, encoding_id.to_string()));
        if let Some(c) = envelope.invalid_char() {
            return Err(EncodeError::InvalidCharacter(c));
        }
        self.enter()?;
        self.stack.push(envelope);
        self.stack.push(XmlNode::new(BODY));
        self.stack.push(XmlNode::new(type_name));
        Ok(())
    }

    fn end_extension_object(&mut self) -> Result<(), EncodeError> {
        self.leave();
        self.close()?;
        self.close()?;
        self.close()
    }

    fn write_null_extension_object(&mut self, field: Option<&str>) -> Result<(), EncodeError> {
        self.put(XmlNode::nil(field.unwrap_or(EXTENSION_OBJECT)))
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
    use super::XmlEncoder;
    use crate::context::EncodingContext;
    use crate::encoding::{Decoder, Encoder, XmlDecoder};
    use crate::registry::DataTypeRegistry;
    use crate::types::{
        ByteString, Guid, LocalizedText, NamespaceTable, NodeId, QualifiedName, UaString,
    };
    use crate::{EncodeError, EncodingLimits};
    use proptest::prelude::*;
    use std::sync::Arc;

    const XMLNS: &str = r#" xmlns="http://opcfoundation.org/UA/2008/02/Types.xsd" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#;

    fn ctx() -> EncodingContext {
        let registry = DataTypeRegistry::builder(NamespaceTable::new()).build().unwrap();
        EncodingContext::for_registry(Arc::new(registry))
    }

    fn encoded(write: impl FnOnce(&mut XmlEncoder)) -> String {
        let mut e = XmlEncoder::new(ctx());
        write(&mut e);
        e.finish_string().unwrap()
    }

    #[test]
    fn unnamed_scalars_use_builtin_names() {
        assert_eq!(
            encoded(|e| e.write_int32(None, -5).unwrap()),
            format!("<Int32{XMLNS}>-5</Int32>")
        );
        assert_eq!(
            encoded(|e| e.write_double(None, f64::NEG_INFINITY).unwrap()),
            format!("<Double{XMLNS}>-INF</Double>")
        );
        assert_eq!(
            encoded(|e| e.write_float(None, 0.1).unwrap()),
            format!("<Float{XMLNS}>0.1</Float>")
        );
        assert_eq!(
            encoded(|e| e.write_double(None, 1e300).unwrap()),
            format!("<Double{XMLNS}>1e300</Double>")
        );
        assert_eq!(
            encoded(|e| e.write_string(None, &UaString::null()).unwrap()),
            format!("<String{XMLNS} xsi:nil=\"true\"/>")
        );
    }

    #[test]
    fn composite_forms() {
        let text = encoded(|e| {
            e.begin_struct(None, "T").unwrap();
            e.write_guid(
                Some("G"),
                &Guid::parse("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap(),
            )
            .unwrap();
            e.write_node_id(Some("N"), &NodeId::numeric(2, 7)).unwrap();
            e.write_qualified_name(Some("Q"), &QualifiedName::new(1, "A")).unwrap();
            e.write_localized_text(Some("L"), &LocalizedText::new("en", "Hi")).unwrap();
            e.write_byte_string(Some("B"), &ByteString::new(vec![1, 2, 3])).unwrap();
            e.write_enumeration(Some("E"), 3).unwrap();
            e.end_struct().unwrap();
        });
        assert_eq!(
            text,
            format!(
                "<T{XMLNS}>\
                 <G><String>72962B91-FA75-4AE6-8D28-B404DC7DAF63</String></G>\
                 <N><Identifier>ns=2;i=7</Identifier></N>\
                 <Q><NamespaceIndex>1</NamespaceIndex><Name>A</Name></Q>\
                 <L><Locale>en</Locale><Text>Hi</Text></L>\
                 <B>AQID</B>\
                 <E>3</E>\
                 </T>"
            )
        );
    }

    #[test]
    fn extension_object_envelope() {
        let text = encoded(|e| {
            e.begin_struct(None, "T").unwrap();
            e.begin_extension_object(Some("X"), &NodeId::numeric(0, 21176), "Url")
                .unwrap();
            e.write_string(Some("S"), &UaString::from("s")).unwrap();
            e.end_extension_object().unwrap();
            e.write_null_extension_object(Some("Y")).unwrap();
            e.write_null_array(Some("A")).unwrap();
            e.end_struct().unwrap();
        });
        assert_eq!(
            text,
            format!(
                "<T{XMLNS}>\
                 <X><TypeId><Identifier>i=21176</Identifier></TypeId>\
                 <Body><Url><S>s</S></Url></Body></X>\
                 <Y xsi:nil=\"true\"/>\
                 <A xsi:nil=\"true\"/>\
                 </T>"
            )
        );

        let mut d = XmlDecoder::parse(ctx(), &text).unwrap();
        d.begin_struct(None).unwrap();
        assert_eq!(
            d.begin_extension_object(Some("X")).unwrap(),
            Some(NodeId::numeric(0, 21176))
        );
        assert_eq!(d.read_string(Some("S")).unwrap(), UaString::from("s"));
        d.end_extension_object().unwrap();
        assert_eq!(d.begin_extension_object(Some("Y")).unwrap(), None);
        assert_eq!(d.begin_array(Some("A")).unwrap(), None);
    }

    #[test]
    fn limits_are_enforced() {
        let ctx = ctx().with_limits(EncodingLimits::default().with_max_depth(1));
        let mut e = XmlEncoder::new(ctx);
        e.begin_struct(None, "T").unwrap();
        assert!(matches!(
            e.begin_struct(Some("U"), "U"),
            Err(EncodeError::LimitExceeded { .. })
        ));

        let ctx = self::ctx().with_limits(EncodingLimits::default().with_max_string_length(2));
        let mut e = XmlEncoder::new(ctx);
        assert!(matches!(
            e.write_string(None, &UaString::from("abc")),
            Err(EncodeError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn characters_outside_xml_are_rejected() {
        let mut e = XmlEncoder::new(ctx());
        assert_eq!(
            e.write_string(None, &UaString::from("a\u{1}b")),
            Err(EncodeError::InvalidCharacter('\u{1}'))
        );
        let mut e = XmlEncoder::new(ctx());
        assert_eq!(
            e.write_node_id(None, &NodeId::string(1, "x\u{FFFF}")),
            Err(EncodeError::InvalidCharacter('\u{FFFF}'))
        );
        let mut e = XmlEncoder::new(ctx());
        assert_eq!(
            e.begin_extension_object(None, &NodeId::string(1, "\u{0}"), "Point"),
            Err(EncodeError::InvalidCharacter('\u{0}'))
        );
        assert_eq!(
            encoded(|e| e.write_string(None, &UaString::from("tab\tline\n")).unwrap()),
            format!("<String{XMLNS}>tab\tline\n</String>")
        );
    }

    proptest! {
        #[test]
        fn scalars_roundtrip(
            f in any::<f32>(),
            d in any::<f64>(),
            i in any::<i64>(),
            s in "[a-zA-Z0-9 <>&'\"\t]*",
        ) {
            let text = encoded(|e| {
                e.begin_array(None, 4).unwrap();
                e.write_float(None, f).unwrap();
                e.write_double(None, d).unwrap();
                e.write_int64(None, i).unwrap();
                e.write_string(None, &UaString::from(s.as_str())).unwrap();
                e.end_array().unwrap();
            });
            let mut decoder = XmlDecoder::parse(ctx(), &text).unwrap();
            prop_assert_eq!(decoder.begin_array(None).unwrap(), Some(4));
            let f2 = decoder.read_float(None).unwrap();
            let d2 = decoder.read_double(None).unwrap();
            if f.is_nan() {
                prop_assert!(f2.is_nan());
            } else {
                prop_assert_eq!(f2.to_bits(), f.to_bits());
            }
            if d.is_nan() {
                prop_assert!(d2.is_nan());
            } else {
                prop_assert_eq!(d2.to_bits(), d.to_bits());
            }
            prop_assert_eq!(decoder.read_int64(None).unwrap(), i);
            prop_assert_eq!(decoder.read_string(None).unwrap(), UaString::from(s.as_str()));
        }
    }
}

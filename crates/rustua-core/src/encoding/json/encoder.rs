use super::{BODY, INFINITY, NAN, NEG_INFINITY, TYPE_ID};
use crate::context::EncodingContext;
use crate::encoding::Encoder;
use crate::structure;
use crate::types::{
    ByteString, DateTime, ExpandedNodeId, Guid, LocalizedText, NodeId, QualifiedName,
    StatusCode, UaString, Value, WireFormat, XmlElement,
};
use crate::EncodeError;
use serde_json::{Map, Number, Value as Json};

#[derive(Debug)]
enum Container {
    Object(Map<String, Json>),
    Array(Vec<Json>),
}

#[derive(Debug)]
struct Open {
    /// Member name under which the finished container lands in its parent.
    name: Option<String>,
    container: Container,
}

fn text_or_null(text: Option<&str>) -> Json {
    text.map_or(Json::Null, |s| Json::String(s.to_owned()))
}

/// Builds an OPC UA JSON document.
#[derive(Debug)]
pub struct JsonEncoder {
    ctx: EncodingContext,
    root: Option<Json>,
    stack: Vec<Open>,
}

impl JsonEncoder {
    pub fn new(ctx: EncodingContext) -> Self {
        Self {
            ctx,
            root: None,
            stack: Vec::new(),
        }
    }

    /// Drops anything written so far.
    pub fn reset(&mut self) {
        self.root = None;
        self.stack.clear();
    }

    /// Takes the finished document, leaving the encoder empty.
    pub fn finish(&mut self) -> Result<Json, EncodeError> {
        if !self.stack.is_empty() {
            return Err(EncodeError::InvalidState("unclosed structure or array"));
        }
        self.root
            .take()
            .ok_or(EncodeError::InvalidState("nothing was written"))
    }

    pub fn finish_string(&mut self) -> Result<String, EncodeError> {
        let document = self.finish()?;
        let text = document.to_string();
        let limit = self.ctx.limits().max_message_size;
        if text.len() > limit {
            return Err(EncodeError::LimitExceeded {
                what: "message size",
                limit,
            });
        }
        Ok(text)
    }

    fn put(&mut self, field: Option<&str>, value: Json) -> Result<(), EncodeError> {
        match self.stack.last_mut() {
            Some(Open {
                container: Container::Object(map),
                ..
            }) => {
                let name = field.ok_or(EncodeError::InvalidState("unnamed member inside an object"))?;
                map.insert(name.to_owned(), value);
                Ok(())
            }
            Some(Open {
                container: Container::Array(items),
                ..
            }) => {
                items.push(value);
                Ok(())
            }
            None if self.root.is_none() => {
                self.root = Some(value);
                Ok(())
            }
            None => Err(EncodeError::InvalidState("document already has a root value")),
        }
    }

    fn open(&mut self, field: Option<&str>, container: Container) -> Result<(), EncodeError> {
        let limit = self.ctx.limits().max_depth;
        if self.stack.len() >= limit {
            return Err(EncodeError::LimitExceeded {
                what: "nesting depth",
                limit,
            });
        }
        self.stack.push(Open {
            name: field.map(str::to_owned),
            container,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), EncodeError> {
        let open = self
            .stack
            .pop()
            .ok_or(EncodeError::InvalidState("close without open"))?;
        let value = match open.container {
            Container::Object(map) => Json::Object(map),
            Container::Array(items) => Json::Array(items),
        };
        self.put(open.name.as_deref(), value)
    }

    fn write_float_value(&mut self, field: Option<&str>, value: f64) -> Result<(), EncodeError> {
        let json = if value.is_nan() {
            Json::String(NAN.to_owned())
        } else if value == f64::INFINITY {
            Json::String(INFINITY.to_owned())
        } else if value == f64::NEG_INFINITY {
            Json::String(NEG_INFINITY.to_owned())
        } else {
            Number::from_f64(value)
                .map(Json::Number)
                .ok_or(EncodeError::OutOfRange { kind: "Double" })?
        };
        self.put(field, json)
    }
}

impl Encoder for JsonEncoder {
    fn context(&self) -> &EncodingContext {
        &self.ctx
    }

    fn format(&self) -> WireFormat {
        WireFormat::Json
    }

    fn write_boolean(&mut self, field: Option<&str>, value: bool) -> Result<(), EncodeError> {
        self.put(field, Json::Bool(value))
    }

    fn write_sbyte(&mut self, field: Option<&str>, value: i8) -> Result<(), EncodeError> {
        self.put(field, Json::from(value))
    }

    fn write_byte(&mut self, field: Option<&str>, value: u8) -> Result<(), EncodeError> {
        self.put(field, Json::from(value))
    }

    fn write_int16(&mut self, field: Option<&str>, value: i16) -> Result<(), EncodeError> {
        self.put(field, Json::from(value))
    }

    fn write_uint16(&mut self, field: Option<&str>, value: u16) -> Result<(), EncodeError> {
        self.put(field, Json::from(value))
    }

    fn write_int32(&mut self, field: Option<&str>, value: i32) -> Result<(), EncodeError> {
        self.put(field, Json::from(value))
    }

    fn write_uint32(&mut self, field: Option<&str>, value: u32) -> Result<(), EncodeError> {
        self.put(field, Json::from(value))
    }

    fn write_int64(&mut self, field: Option<&str>, value: i64) -> Result<(), EncodeError> {
        self.put(field, Json::String(value.to_string()))
    }

    fn write_uint64(&mut self, field: Option<&str>, value: u64) -> Result<(), EncodeError> {
        self.put(field, Json::String(value.to_string()))
    }

    fn write_float(&mut self, field: Option<&str>, value: f32) -> Result<(), EncodeError> {
        // shortest f32 text, so 0.1f32 is written as 0.1 rather than its f64 widening
        let widened = if value.is_finite() {
            format!("{value:e}")
                .parse::<f64>()
                .map_err(|_| EncodeError::OutOfRange { kind: "Float" })?
        } else {
            f64::from(value)
        };
        self.write_float_value(field, widened)
    }

    fn write_double(&mut self, field: Option<&str>, value: f64) -> Result<(), EncodeError> {
        self.write_float_value(field, value)
    }

    fn write_string(&mut self, field: Option<&str>, value: &UaString) -> Result<(), EncodeError> {
        if value.len() > self.ctx.limits().max_string_length {
            return Err(EncodeError::LimitExceeded {
                what: "string length",
                limit: self.ctx.limits().max_string_length,
            });
        }
        self.put(field, text_or_null(value.as_str()))
    }

    fn write_date_time(&mut self, field: Option<&str>, value: DateTime) -> Result<(), EncodeError> {
        self.put(field, Json::String(value.to_iso8601()))
    }

    fn write_guid(&mut self, field: Option<&str>, value: &Guid) -> Result<(), EncodeError> {
        self.put(field, Json::String(value.to_string()))
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
        self.put(field, value.to_base64().map_or(Json::Null, Json::String))
    }

    fn write_xml_element(
        &mut self,
        field: Option<&str>,
        value: &XmlElement,
    ) -> Result<(), EncodeError> {
        self.put(field, text_or_null(value.fragment()))
    }

    fn write_node_id(&mut self, field: Option<&str>, value: &NodeId) -> Result<(), EncodeError> {
        self.put(field, Json::String(value.to_string()))
    }

    fn write_expanded_node_id(
        &mut self,
        field: Option<&str>,
        value: &ExpandedNodeId,
    ) -> Result<(), EncodeError> {
        self.put(field, Json::String(value.to_string()))
    }

    fn write_status_code(
        &mut self,
        field: Option<&str>,
        value: StatusCode,
    ) -> Result<(), EncodeError> {
        self.put(field, Json::from(value.bits()))
    }

    fn write_qualified_name(
        &mut self,
        field: Option<&str>,
        value: &QualifiedName,
    ) -> Result<(), EncodeError> {
        let mut map = Map::new();
        map.insert("Name".to_owned(), text_or_null(value.name.as_str()));
        if value.namespace_index != 0 {
            map.insert("Uri".to_owned(), Json::from(value.namespace_index));
        }
        self.put(field, Json::Object(map))
    }

    fn write_localized_text(
        &mut self,
        field: Option<&str>,
        value: &LocalizedText,
    ) -> Result<(), EncodeError> {
        let mut map = Map::new();
        if let Some(locale) = value.locale.as_str() {
            map.insert("Locale".to_owned(), Json::String(locale.to_owned()));
        }
        if let Some(text) = value.text.as_str() {
            map.insert("Text".to_owned(), Json::String(text.to_owned()));
        }
        self.put(field, Json::Object(map))
    }

    fn write_enumeration(&mut self, field: Option<&str>, value: i32) -> Result<(), EncodeError> {
        self.put(field, Json::from(value))
    }

    fn write_optional_mask(&mut self, _mask: u32) -> Result<(), EncodeError> {
        Ok(())
    }

    fn begin_struct(&mut self, field: Option<&str>, _type_name: &str) -> Result<(), EncodeError> {
        self.open(field, Container::Object(Map::new()))
    }

    fn end_struct(&mut self) -> Result<(), EncodeError> {
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
        self.open(field, Container::Array(Vec::with_capacity(len)))
    }

    fn end_array(&mut self) -> Result<(), EncodeError> {
        self.close()
    }

    fn write_null_array(&mut self, field: Option<&str>) -> Result<(), EncodeError> {
        self.put(field, Json::Null)
    }

    fn begin_extension_object(
        &mut self,
        field: Option<&str>,
        encoding_id: &NodeId,
        _type_name: &str,
    ) -> Result<(), EncodeError> {
        let mut envelope = Map::new();
        envelope.insert(TYPE_ID.to_owned(), Json::String(encoding_id.to_string()));
        self.open(field, Container::Object(envelope))?;
        self.open(Some(BODY), Container::Object(Map::new()))
    }

    fn end_extension_object(&mut self) -> Result<(), EncodeError> {
        self.close()?;
        self.close()
    }

    fn write_null_extension_object(&mut self, field: Option<&str>) -> Result<(), EncodeError> {
        self.put(field, Json::Null)
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
    use super::JsonEncoder;
    use crate::context::EncodingContext;
    use crate::encoding::{Decoder, Encoder, JsonDecoder};
    use crate::registry::DataTypeRegistry;
    use crate::types::{
        ByteString, Guid, LocalizedText, NamespaceTable, NodeId, QualifiedName, UaString,
    };
    use crate::EncodeError;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn ctx() -> EncodingContext {
        let registry = DataTypeRegistry::builder(NamespaceTable::new()).build().unwrap();
        EncodingContext::for_registry(Arc::new(registry))
    }

    fn encoded(write: impl FnOnce(&mut JsonEncoder)) -> String {
        let mut e = JsonEncoder::new(ctx());
        write(&mut e);
        e.finish_string().unwrap()
    }

    #[test]
    fn scalar_forms() {
        assert_eq!(encoded(|e| e.write_int64(None, -5).unwrap()), "\"-5\"");
        assert_eq!(encoded(|e| e.write_uint64(None, u64::MAX).unwrap()), "\"18446744073709551615\"");
        assert_eq!(encoded(|e| e.write_float(None, 0.1).unwrap()), "0.1");
        assert_eq!(encoded(|e| e.write_float(None, f32::NAN).unwrap()), "\"NaN\"");
        assert_eq!(
            encoded(|e| e.write_double(None, f64::NEG_INFINITY).unwrap()),
            "\"-Infinity\""
        );
        assert_eq!(encoded(|e| e.write_string(None, &UaString::null()).unwrap()), "null");
        assert_eq!(
            encoded(|e| e.write_byte_string(None, &ByteString::new(vec![1, 2, 3])).unwrap()),
            "\"AQID\""
        );
        assert_eq!(
            encoded(|e| e.write_guid(None, &Guid::parse("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap()).unwrap()),
            "\"72962B91-FA75-4AE6-8D28-B404DC7DAF63\""
        );
        assert_eq!(
            encoded(|e| e.write_node_id(None, &NodeId::numeric(2, 7)).unwrap()),
            "\"ns=2;i=7\""
        );
    }

    #[test]
    fn composite_forms() {
        assert_eq!(
            encoded(|e| e.write_qualified_name(None, &QualifiedName::new(0, "A")).unwrap()),
            r#"{"Name":"A"}"#
        );
        assert_eq!(
            encoded(|e| e.write_localized_text(None, &LocalizedText::new("en", "Hi")).unwrap()),
            r#"{"Locale":"en","Text":"Hi"}"#
        );
    }

    #[test]
    fn nested_containers_keep_member_order() {
        let text = encoded(|e| {
            e.begin_struct(None, "T").unwrap();
            e.write_int32(Some("B"), 1).unwrap();
            e.begin_array(Some("A"), 2).unwrap();
            e.write_boolean(None, true).unwrap();
            e.write_boolean(None, false).unwrap();
            e.end_array().unwrap();
            e.write_null_array(Some("N")).unwrap();
            e.begin_extension_object(Some("X"), &NodeId::numeric(0, 24002), "T")
                .unwrap();
            e.write_string(Some("S"), &UaString::from("s")).unwrap();
            e.end_extension_object().unwrap();
            e.end_struct().unwrap();
        });
        assert_eq!(
            text,
            r#"{"B":1,"A":[true,false],"N":null,"X":{"TypeId":"i=24002","Body":{"S":"s"}}}"#
        );
    }

    #[test]
    fn unnamed_member_in_object_is_rejected() {
        let mut e = JsonEncoder::new(ctx());
        e.begin_struct(None, "T").unwrap();
        assert!(matches!(
            e.write_int32(None, 1),
            Err(EncodeError::InvalidState(_))
        ));
    }

    #[test]
    fn unclosed_document_is_rejected() {
        let mut e = JsonEncoder::new(ctx());
        e.begin_struct(None, "T").unwrap();
        assert!(e.finish().is_err());
    }

    proptest! {
        #[test]
        fn floats_roundtrip(f in any::<f32>(), d in any::<f64>()) {
            let text = encoded(|e| {
                e.begin_array(None, 2).unwrap();
                e.write_float(None, f).unwrap();
                e.write_double(None, d).unwrap();
                e.end_array().unwrap();
            });
            let mut decoder = JsonDecoder::parse(ctx(), &text).unwrap();
            decoder.begin_array(None).unwrap();
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
        }

        #[test]
        fn sixty_four_bit_roundtrip(a in any::<i64>(), b in any::<u64>()) {
            let text = encoded(|e| {
                e.begin_struct(None, "T").unwrap();
                e.write_int64(Some("A"), a).unwrap();
                e.write_uint64(Some("B"), b).unwrap();
                e.end_struct().unwrap();
            });
            let mut decoder = JsonDecoder::parse(ctx(), &text).unwrap();
            decoder.begin_struct(None).unwrap();
            prop_assert_eq!(decoder.read_int64(Some("A")).unwrap(), a);
            prop_assert_eq!(decoder.read_uint64(Some("B")).unwrap(), b);
        }
    }
}

use super::{BODY, ENCODING, INFINITY, NAN, NEG_INFINITY, TYPE_ID};
use crate::context::EncodingContext;
use crate::encoding::literal::{narrow_f32, parse_integer};
use crate::encoding::Decoder;
use crate::structure;
use crate::types::{
    ByteString, DateTime, ExpandedNodeId, Guid, LocalizedText, NodeId, QualifiedName,
    StatusCode, UaString, Value, WireFormat, XmlElement,
};
use crate::DecodeError;
use core::num::ParseIntError;
use core::str::FromStr;
use serde_json::Value as Json;
use std::collections::VecDeque;

type Members = VecDeque<(String, Json)>;

#[derive(Debug)]
enum Frame {
    /// Members not yet consumed, in document order.
    Object(Members),
    Array(VecDeque<Json>),
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn unexpected(kind: &'static str, found: &Json) -> DecodeError {
    DecodeError::malformed(kind, format!("unexpected {}", json_kind(found)))
}

fn take_member(members: &mut Members, name: &str) -> Option<Json> {
    let index = members.iter().position(|(key, _)| key == name)?;
    members.remove(index).map(|(_, value)| value)
}

fn optional_text(value: Option<Json>, kind: &'static str) -> Result<UaString, DecodeError> {
    match value {
        None | Some(Json::Null) => Ok(UaString::null()),
        Some(Json::String(s)) => Ok(UaString::new(s)),
        Some(other) => Err(unexpected(kind, &other)),
    }
}

/// Reads the OPC UA JSON encoding from a parsed document.
///
/// A named read takes the member of that name from the object the decoder
/// is inside; an unnamed read takes the next value in document order, from
/// an array or an object alike. Consumed members are removed, so reading
/// the same name twice fails with [`DecodeError::MissingField`]. Array
/// elements have no names, so a named read inside an array fails the same way.
#[derive(Debug)]
pub struct JsonDecoder {
    ctx: EncodingContext,
    root: Option<Json>,
    stack: Vec<Frame>,
}

impl JsonDecoder {
    /// A decoder with no document; call [`JsonDecoder::reset`] before reading.
    pub fn new(ctx: EncodingContext) -> Self {
        Self {
            ctx,
            root: None,
            stack: Vec::new(),
        }
    }

    /// Parses `text` and positions the decoder before its root value.
    pub fn parse(ctx: EncodingContext, text: &str) -> Result<Self, DecodeError> {
        let mut decoder = Self::new(ctx);
        decoder.reset(text)?;
        Ok(decoder)
    }

    /// Replaces the document, discarding any read position.
    pub fn reset(&mut self, text: &str) -> Result<(), DecodeError> {
        let limit = self.ctx.limits().max_message_size;
        if text.len() > limit {
            return Err(DecodeError::LimitExceeded {
                what: "message size",
                limit,
            });
        }
        let value = serde_json::from_str(text)
            .map_err(|err| DecodeError::MalformedDocument(err.to_string()))?;
        self.reset_value(value);
        Ok(())
    }

    /// Like [`reset`](Self::reset) for a document that is already parsed.
    /// The message size limit does not apply.
    pub fn reset_value(&mut self, value: Json) {
        self.root = Some(value);
        self.stack.clear();
    }

    fn take(&mut self, field: Option<&str>) -> Result<Json, DecodeError> {
        match (self.stack.last_mut(), field) {
            (Some(Frame::Object(members)), Some(name)) => {
                take_member(members, name).ok_or_else(|| DecodeError::MissingField(name.to_owned()))
            }
            (Some(Frame::Object(members)), None) => members
                .pop_front()
                .map(|(_, value)| value)
                .ok_or(DecodeError::UnexpectedEof),
            (Some(Frame::Array(items)), None) => {
                items.pop_front().ok_or(DecodeError::UnexpectedEof)
            }
            (Some(Frame::Array(_)) | None, Some(name)) => {
                Err(DecodeError::MissingField(name.to_owned()))
            }
            (None, None) => self.root.take().ok_or(DecodeError::UnexpectedEof),
        }
    }

    fn push(&mut self, frame: Frame) -> Result<(), DecodeError> {
        let limit = self.ctx.limits().max_depth;
        if self.stack.len() >= limit {
            return Err(DecodeError::LimitExceeded {
                what: "nesting depth",
                limit,
            });
        }
        self.stack.push(frame);
        Ok(())
    }

    fn take_string(&mut self, field: Option<&str>, kind: &'static str) -> Result<String, DecodeError> {
        match self.take(field)? {
            Json::String(s) => Ok(s),
            other => Err(unexpected(kind, &other)),
        }
    }

    fn take_nullable_string(
        &mut self,
        field: Option<&str>,
        kind: &'static str,
    ) -> Result<Option<String>, DecodeError> {
        match self.take(field)? {
            Json::String(s) => Ok(Some(s)),
            Json::Null => Ok(None),
            other => Err(unexpected(kind, &other)),
        }
    }

    /// Nullable string checked against the string length limit.
    fn take_bounded_string(
        &mut self,
        field: Option<&str>,
        kind: &'static str,
    ) -> Result<Option<String>, DecodeError> {
        let text = self.take_nullable_string(field, kind)?;
        let limit = self.ctx.limits().max_string_length;
        if text.as_ref().is_some_and(|t| t.len() > limit) {
            return Err(DecodeError::LimitExceeded {
                what: "string length",
                limit,
            });
        }
        Ok(text)
    }

    fn read_integer(&mut self, field: Option<&str>, kind: &'static str) -> Result<i128, DecodeError> {
        let value = self.take(field)?;
        let Json::Number(n) = &value else {
            return Err(unexpected(kind, &value));
        };
        if let Some(v) = n.as_i64() {
            return Ok(i128::from(v));
        }
        if let Some(v) = n.as_u64() {
            return Ok(i128::from(v));
        }
        match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i128),
            _ => Err(DecodeError::malformed(kind, format!("'{n}' is not an integer"))),
        }
    }

    fn read_narrow<T>(&mut self, field: Option<&str>, kind: &'static str) -> Result<T, DecodeError>
    where
        T: TryFrom<i128>,
    {
        let value = self.read_integer(field, kind)?;
        T::try_from(value).map_err(|_| DecodeError::out_of_range(kind, value))
    }

    /// Int64 and UInt64 must be quoted; a bare number is rejected.
    fn read_quoted<T>(&mut self, field: Option<&str>, kind: &'static str) -> Result<T, DecodeError>
    where
        T: FromStr<Err = ParseIntError>,
    {
        match self.take(field)? {
            Json::String(s) => parse_integer(&s, kind),
            Json::Number(n) => Err(DecodeError::malformed(
                kind,
                format!("{n} must be a quoted string"),
            )),
            other => Err(unexpected(kind, &other)),
        }
    }

    fn read_json_float(
        &mut self,
        field: Option<&str>,
        kind: &'static str,
    ) -> Result<(f64, String), DecodeError> {
        match self.take(field)? {
            Json::Number(n) => n
                .as_f64()
                .map(|v| (v, n.to_string()))
                .ok_or_else(|| DecodeError::malformed(kind, n.to_string())),
            Json::String(s) => match s.as_str() {
                INFINITY => Ok((f64::INFINITY, s)),
                NEG_INFINITY => Ok((f64::NEG_INFINITY, s)),
                NAN => Ok((f64::NAN, s)),
                _ => Err(DecodeError::malformed(kind, format!("'{s}'"))),
            },
            other => Err(unexpected(kind, &other)),
        }
    }
}

impl Decoder for JsonDecoder {
    fn context(&self) -> &EncodingContext {
        &self.ctx
    }

    fn format(&self) -> WireFormat {
        WireFormat::Json
    }

    fn read_boolean(&mut self, field: Option<&str>) -> Result<bool, DecodeError> {
        match self.take(field)? {
            Json::Bool(v) => Ok(v),
            other => Err(unexpected("Boolean", &other)),
        }
    }

    fn read_sbyte(&mut self, field: Option<&str>) -> Result<i8, DecodeError> {
        self.read_narrow(field, "SByte")
    }

    fn read_byte(&mut self, field: Option<&str>) -> Result<u8, DecodeError> {
        self.read_narrow(field, "Byte")
    }

    fn read_int16(&mut self, field: Option<&str>) -> Result<i16, DecodeError> {
        self.read_narrow(field, "Int16")
    }

    fn read_uint16(&mut self, field: Option<&str>) -> Result<u16, DecodeError> {
        self.read_narrow(field, "UInt16")
    }

    fn read_int32(&mut self, field: Option<&str>) -> Result<i32, DecodeError> {
        self.read_narrow(field, "Int32")
    }

    fn read_uint32(&mut self, field: Option<&str>) -> Result<u32, DecodeError> {
        self.read_narrow(field, "UInt32")
    }

    fn read_int64(&mut self, field: Option<&str>) -> Result<i64, DecodeError> {
        self.read_quoted(field, "Int64")
    }

    fn read_uint64(&mut self, field: Option<&str>) -> Result<u64, DecodeError> {
        self.read_quoted(field, "UInt64")
    }

    fn read_float(&mut self, field: Option<&str>) -> Result<f32, DecodeError> {
        let (value, literal) = self.read_json_float(field, "Float")?;
        narrow_f32(value, literal)
    }

    fn read_double(&mut self, field: Option<&str>) -> Result<f64, DecodeError> {
        Ok(self.read_json_float(field, "Double")?.0)
    }

    fn read_string(&mut self, field: Option<&str>) -> Result<UaString, DecodeError> {
        Ok(self.take_bounded_string(field, "String")?.into())
    }

    fn read_date_time(&mut self, field: Option<&str>) -> Result<DateTime, DecodeError> {
        DateTime::parse_iso8601(&self.take_string(field, "DateTime")?)
    }

    fn read_guid(&mut self, field: Option<&str>) -> Result<Guid, DecodeError> {
        Guid::parse(&self.take_string(field, "Guid")?)
    }

    fn read_byte_string(&mut self, field: Option<&str>) -> Result<ByteString, DecodeError> {
        match self.take_nullable_string(field, "ByteString")? {
            Some(text) => {
                let bytes = ByteString::from_base64(&text)?;
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
        Ok(self.take_bounded_string(field, "XmlElement")?.into())
    }

    fn read_node_id(&mut self, field: Option<&str>) -> Result<NodeId, DecodeError> {
        match self.take_nullable_string(field, "NodeId")? {
            Some(text) => text.parse(),
            None => Ok(NodeId::NULL),
        }
    }

    fn read_expanded_node_id(
        &mut self,
        field: Option<&str>,
    ) -> Result<ExpandedNodeId, DecodeError> {
        match self.take_nullable_string(field, "ExpandedNodeId")? {
            Some(text) => text.parse(),
            None => Ok(ExpandedNodeId::default()),
        }
    }

    fn read_status_code(&mut self, field: Option<&str>) -> Result<StatusCode, DecodeError> {
        let code = match self.take(field)? {
            Json::Null => 0,
            Json::Number(n) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| DecodeError::out_of_range("StatusCode", &n))?,
            Json::Object(map) => match map.get("Code") {
                Some(Json::Number(n)) => n
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| DecodeError::out_of_range("StatusCode", n))?,
                None => 0,
                Some(other) => return Err(unexpected("StatusCode", other)),
            },
            other => return Err(unexpected("StatusCode", &other)),
        };
        Ok(StatusCode::new(code))
    }

    fn read_qualified_name(&mut self, field: Option<&str>) -> Result<QualifiedName, DecodeError> {
        let mut map = match self.take(field)? {
            Json::Object(map) => map,
            Json::Null => return Ok(QualifiedName::default()),
            other => return Err(unexpected("QualifiedName", &other)),
        };
        let name = optional_text(map.remove("Name"), "QualifiedName")?;
        let namespace_index = match map.remove("Uri") {
            None | Some(Json::Null) => 0,
            Some(Json::Number(n)) => n
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| DecodeError::out_of_range("QualifiedName", &n))?,
            Some(other) => return Err(unexpected("QualifiedName", &other)),
        };
        Ok(QualifiedName::new(namespace_index, name))
    }

    fn read_localized_text(&mut self, field: Option<&str>) -> Result<LocalizedText, DecodeError> {
        let mut map = match self.take(field)? {
            Json::Object(map) => map,
            Json::Null => return Ok(LocalizedText::NULL),
            other => return Err(unexpected("LocalizedText", &other)),
        };
        let locale = optional_text(map.remove("Locale"), "LocalizedText")?;
        let text = optional_text(map.remove("Text"), "LocalizedText")?;
        Ok(LocalizedText::new(locale, text))
    }

    fn read_enumeration(&mut self, field: Option<&str>) -> Result<i32, DecodeError> {
        self.read_narrow(field, "Enumeration")
    }

    fn read_optional_mask(&mut self, optional_fields: &[&str]) -> Result<u32, DecodeError> {
        let Some(Frame::Object(members)) = self.stack.last() else {
            return Err(DecodeError::InvalidState("optional mask outside an object"));
        };
        Ok(optional_fields
            .iter()
            .enumerate()
            .filter(|(_, name)| members.iter().any(|(key, _)| key == *name))
            .fold(0, |mask, (bit, _)| mask | (1 << bit)))
    }

    fn begin_struct(&mut self, field: Option<&str>) -> Result<(), DecodeError> {
        match self.take(field)? {
            Json::Object(map) => self.push(Frame::Object(map.into_iter().collect())),
            other => Err(unexpected("Structure", &other)),
        }
    }

    fn end_struct(&mut self) -> Result<(), DecodeError> {
        match self.stack.pop() {
            Some(Frame::Object(_)) => Ok(()),
            _ => Err(DecodeError::InvalidState("end_struct without begin_struct")),
        }
    }

    fn begin_array(&mut self, field: Option<&str>) -> Result<Option<usize>, DecodeError> {
        match self.take(field)? {
            Json::Array(items) => {
                let limit = self.ctx.limits().max_array_length;
                if items.len() > limit {
                    return Err(DecodeError::LimitExceeded {
                        what: "array length",
                        limit,
                    });
                }
                let len = items.len();
                self.push(Frame::Array(items.into()))?;
                Ok(Some(len))
            }
            Json::Null => Ok(None),
            other => Err(unexpected("Array", &other)),
        }
    }

    fn end_array(&mut self) -> Result<(), DecodeError> {
        match self.stack.pop() {
            Some(Frame::Array(_)) => Ok(()),
            _ => Err(DecodeError::InvalidState("end_array without begin_array")),
        }
    }

    fn begin_extension_object(
        &mut self,
        field: Option<&str>,
    ) -> Result<Option<NodeId>, DecodeError> {
        let mut envelope: Members = match self.take(field)? {
            Json::Null => return Ok(None),
            Json::Object(map) => map.into_iter().collect(),
            other => return Err(unexpected("ExtensionObject", &other)),
        };
        match take_member(&mut envelope, ENCODING) {
            None | Some(Json::Null) => {}
            Some(Json::Number(n)) if n.as_u64() == Some(0) => {}
            Some(_) => {
                return Err(DecodeError::Unsupported(
                    "non-JSON extension object body in a JSON document",
                ))
            }
        }
        let type_id: NodeId = match take_member(&mut envelope, TYPE_ID) {
            Some(Json::String(text)) => text.parse()?,
            Some(other) => return Err(unexpected("ExtensionObject", &other)),
            None => return Err(DecodeError::MissingField(TYPE_ID.to_owned())),
        };
        match take_member(&mut envelope, BODY) {
            Some(Json::Object(body)) => self.push(Frame::Object(body.into_iter().collect()))?,
            Some(other) => return Err(unexpected("ExtensionObject", &other)),
            None => return Err(DecodeError::MissingField(BODY.to_owned())),
        }
        Ok(Some(type_id))
    }

    fn end_extension_object(&mut self) -> Result<(), DecodeError> {
        match self.stack.pop() {
            Some(Frame::Object(_)) => Ok(()),
            _ => Err(DecodeError::InvalidState(
                "end_extension_object without begin_extension_object",
            )),
        }
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

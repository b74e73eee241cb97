//! Schema-driven structure codec and the structured-value plumbing shared by
//! every backend: inline structures, extension objects and their arrays.

use crate::context::EncodingContext;
use crate::encoding::{Decoder, Encoder};
use crate::registry::{CodecEntry, DataTypeCodec};
use crate::schema::{FieldKind, FieldLayout, StructureDefinition, StructureLayout, StructureType};
use crate::types::{BuiltinType, ExpandedNodeId, Field, NodeId, StructValue, TypeIdentity, Value};
use crate::{DecodeError, EncodeError};

/// Member name of the union selector in the XML and JSON encodings.
pub const SWITCH_FIELD: &str = "SwitchField";

const MAX_PREALLOCATED_ITEMS: usize = 1024;

/// Encodes any structure from its [`StructureDefinition`].
///
/// Field order drives the binary layout; field names drive XML and JSON.
/// Structures with optional fields carry a 32-bit presence mask in binary,
/// unions a 32-bit switch value where `0` selects no arm.
#[derive(Debug)]
pub struct GenericStructureCodec {
    name: String,
    identity: TypeIdentity,
    definition: StructureDefinition,
    layout: StructureLayout,
}

impl GenericStructureCodec {
    pub(crate) fn new(
        name: String,
        identity: TypeIdentity,
        definition: StructureDefinition,
        layout: StructureLayout,
    ) -> Self {
        Self {
            name,
            identity,
            definition,
            layout,
        }
    }

    pub fn definition(&self) -> &StructureDefinition {
        &self.definition
    }

    pub fn layout(&self) -> &StructureLayout {
        &self.layout
    }

    fn decode_fields(
        &self,
        decoder: &mut dyn Decoder,
        mask: Option<u32>,
    ) -> Result<Vec<Field>, DecodeError> {
        let mut fields = Vec::with_capacity(self.layout.fields.len());
        let mut bit = 0;
        for layout in &self.layout.fields {
            let present = if layout.is_optional {
                let present = mask.map_or(true, |m| m & (1 << bit) != 0);
                bit += 1;
                present
            } else {
                true
            };
            let value = if present {
                Some(read_field(decoder, layout)?)
            } else {
                None
            };
            fields.push(Field {
                name: layout.name.clone(),
                value,
            });
        }
        Ok(fields)
    }

    fn decode_union(&self, decoder: &mut dyn Decoder) -> Result<Vec<Field>, DecodeError> {
        let switch = decoder.read_uint32(Some(SWITCH_FIELD))?;
        let selected = match usize::try_from(switch) {
            Ok(0) => None,
            Ok(arm) if arm <= self.layout.fields.len() => Some(arm - 1),
            _ => return Err(DecodeError::out_of_range("SwitchField", switch)),
        };

        let mut fields = Vec::with_capacity(self.layout.fields.len());
        for (index, layout) in self.layout.fields.iter().enumerate() {
            let value = if selected == Some(index) {
                Some(read_field(decoder, layout)?)
            } else {
                None
            };
            fields.push(Field {
                name: layout.name.clone(),
                value,
            });
        }
        Ok(fields)
    }

    fn check_shape(&self, value: &StructValue) -> Result<(), EncodeError> {
        let matches = value.fields().len() == self.layout.fields.len()
            && value
                .fields()
                .iter()
                .zip(&self.layout.fields)
                .all(|(field, layout)| field.name == layout.name);
        if matches {
            return Ok(());
        }
        let expected: Vec<&str> = self.layout.fields.iter().map(|f| f.name.as_str()).collect();
        let found: Vec<&str> = value.fields().iter().map(|f| f.name.as_str()).collect();
        Err(EncodeError::SchemaMismatch(format!(
            "{} expects fields {expected:?}, found {found:?}",
            self.name
        )))
    }

    fn required<'v>(&self, layout: &FieldLayout, field: &'v Field) -> Result<&'v Value, EncodeError> {
        field.value.as_ref().ok_or_else(|| {
            EncodeError::SchemaMismatch(format!("{}.{} is not optional", self.name, layout.name))
        })
    }
}

impl DataTypeCodec for GenericStructureCodec {
    fn identity(&self) -> &TypeIdentity {
        &self.identity
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn base_data_type(&self) -> Option<&NodeId> {
        Some(&self.definition.base_data_type)
    }

    fn decode(
        &self,
        _ctx: &EncodingContext,
        decoder: &mut dyn Decoder,
    ) -> Result<StructValue, DecodeError> {
        log::trace!("decoding {} ({})", self.name, decoder.format());
        let fields = match self.layout.structure_type {
            StructureType::Structure => self.decode_fields(decoder, None)?,
            StructureType::StructureWithOptionalFields => {
                let optional = self.layout.optional_field_names();
                let mask = decoder.read_optional_mask(&optional)?;
                self.decode_fields(decoder, Some(mask))?
            }
            StructureType::Union => self.decode_union(decoder)?,
        };
        Ok(StructValue::new(self.identity.type_id.clone(), fields))
    }

    fn encode(
        &self,
        _ctx: &EncodingContext,
        encoder: &mut dyn Encoder,
        value: &StructValue,
    ) -> Result<(), EncodeError> {
        log::trace!("encoding {} ({})", self.name, encoder.format());
        self.check_shape(value)?;
        let pairs = self.layout.fields.iter().zip(value.fields());

        match self.layout.structure_type {
            StructureType::Structure => {
                for (layout, field) in pairs {
                    write_field(encoder, layout, self.required(layout, field)?)?;
                }
            }
            StructureType::StructureWithOptionalFields => {
                let mut mask = 0u32;
                let mut bit = 0;
                for (layout, field) in pairs.clone() {
                    if layout.is_optional {
                        if field.value.is_some() {
                            mask |= 1 << bit;
                        }
                        bit += 1;
                    } else {
                        self.required(layout, field)?;
                    }
                }
                encoder.write_optional_mask(mask)?;
                for (layout, field) in pairs {
                    if let Some(v) = &field.value {
                        write_field(encoder, layout, v)?;
                    }
                }
            }
            StructureType::Union => {
                let mut present = pairs.enumerate().filter(|(_, (_, f))| f.value.is_some());
                let selected = present.next();
                if present.next().is_some() {
                    return Err(EncodeError::SchemaMismatch(format!(
                        "union {} has more than one arm set",
                        self.name
                    )));
                }
                match selected {
                    None => encoder.write_uint32(Some(SWITCH_FIELD), 0)?,
                    Some((index, (layout, field))) => {
                        let switch = u32::try_from(index + 1)
                            .map_err(|_| EncodeError::OutOfRange { kind: "SwitchField" })?;
                        encoder.write_uint32(Some(SWITCH_FIELD), switch)?;
                        write_field(encoder, layout, self.required(layout, field)?)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_field(decoder: &mut dyn Decoder, layout: &FieldLayout) -> Result<Value, DecodeError> {
    let name = Some(layout.name.as_str());
    match (&layout.kind, layout.is_array) {
        (FieldKind::Structure(dt) | FieldKind::ExtensionObject(dt), false) => {
            decoder.read_struct(name, dt)
        }
        (FieldKind::Structure(dt) | FieldKind::ExtensionObject(dt), true) => {
            decoder.read_struct_array(name, dt)
        }
        (kind, false) => read_scalar(decoder, name, kind),
        (kind, true) => {
            let Some(len) = decoder.begin_array(name)? else {
                return Ok(Value::Array(None));
            };
            let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATED_ITEMS));
            for _ in 0..len {
                items.push(read_scalar(decoder, None, kind)?);
            }
            decoder.end_array()?;
            Ok(Value::Array(Some(items)))
        }
    }
}

fn read_scalar(
    decoder: &mut dyn Decoder,
    field: Option<&str>,
    kind: &FieldKind,
) -> Result<Value, DecodeError> {
    let builtin = match kind {
        FieldKind::Builtin(builtin) => *builtin,
        FieldKind::Enumeration => return Ok(Value::Enumeration(decoder.read_enumeration(field)?)),
        FieldKind::Structure(dt) | FieldKind::ExtensionObject(dt) => {
            return decoder.read_struct(field, dt)
        }
    };
    Ok(match builtin {
        BuiltinType::Boolean => Value::Boolean(decoder.read_boolean(field)?),
        BuiltinType::SByte => Value::SByte(decoder.read_sbyte(field)?),
        BuiltinType::Byte => Value::Byte(decoder.read_byte(field)?),
        BuiltinType::Int16 => Value::Int16(decoder.read_int16(field)?),
        BuiltinType::UInt16 => Value::UInt16(decoder.read_uint16(field)?),
        BuiltinType::Int32 => Value::Int32(decoder.read_int32(field)?),
        BuiltinType::UInt32 => Value::UInt32(decoder.read_uint32(field)?),
        BuiltinType::Int64 => Value::Int64(decoder.read_int64(field)?),
        BuiltinType::UInt64 => Value::UInt64(decoder.read_uint64(field)?),
        BuiltinType::Float => Value::Float(decoder.read_float(field)?),
        BuiltinType::Double => Value::Double(decoder.read_double(field)?),
        BuiltinType::String => Value::String(decoder.read_string(field)?),
        BuiltinType::DateTime => Value::DateTime(decoder.read_date_time(field)?),
        BuiltinType::Guid => Value::Guid(decoder.read_guid(field)?),
        BuiltinType::ByteString => Value::ByteString(decoder.read_byte_string(field)?),
        BuiltinType::XmlElement => Value::XmlElement(decoder.read_xml_element(field)?),
        BuiltinType::NodeId => Value::NodeId(decoder.read_node_id(field)?),
        BuiltinType::ExpandedNodeId => Value::ExpandedNodeId(decoder.read_expanded_node_id(field)?),
        BuiltinType::StatusCode => Value::StatusCode(decoder.read_status_code(field)?),
        BuiltinType::QualifiedName => Value::QualifiedName(decoder.read_qualified_name(field)?),
        BuiltinType::LocalizedText => Value::LocalizedText(decoder.read_localized_text(field)?),
        BuiltinType::ExtensionObject
        | BuiltinType::DataValue
        | BuiltinType::Variant
        | BuiltinType::DiagnosticInfo => {
            return Err(DecodeError::Unsupported(builtin_unsupported(builtin)))
        }
    })
}

fn builtin_unsupported(builtin: BuiltinType) -> &'static str {
    match builtin {
        BuiltinType::DataValue => "DataValue fields",
        BuiltinType::Variant => "Variant fields",
        BuiltinType::DiagnosticInfo => "DiagnosticInfo fields",
        _ => "extension object without a declared data type",
    }
}

fn write_field(
    encoder: &mut dyn Encoder,
    layout: &FieldLayout,
    value: &Value,
) -> Result<(), EncodeError> {
    let name = Some(layout.name.as_str());
    match (&layout.kind, layout.is_array) {
        (FieldKind::Structure(dt) | FieldKind::ExtensionObject(dt), false) => {
            encoder.write_struct(name, value, dt)
        }
        (FieldKind::Structure(dt) | FieldKind::ExtensionObject(dt), true) => {
            encoder.write_struct_array(name, value, dt)
        }
        (kind, false) => write_scalar(encoder, name, kind, value),
        (kind, true) => match value {
            Value::Array(None) => encoder.write_null_array(name),
            Value::Array(Some(items)) => {
                encoder.begin_array(name, items.len())?;
                for item in items {
                    write_scalar(encoder, None, kind, item)?;
                }
                encoder.end_array()
            }
            other => Err(EncodeError::SchemaMismatch(format!(
                "field '{}' is an array, found {}",
                layout.name,
                other.kind_name()
            ))),
        },
    }
}

fn write_scalar(
    encoder: &mut dyn Encoder,
    field: Option<&str>,
    kind: &FieldKind,
    value: &Value,
) -> Result<(), EncodeError> {
    match (kind, value) {
        (FieldKind::Structure(dt) | FieldKind::ExtensionObject(dt), v) => {
            encoder.write_struct(field, v, dt)
        }
        (FieldKind::Enumeration, Value::Enumeration(v)) => encoder.write_enumeration(field, *v),
        (FieldKind::Builtin(builtin), v) => match (builtin, v) {
            (BuiltinType::Boolean, Value::Boolean(v)) => encoder.write_boolean(field, *v),
            (BuiltinType::SByte, Value::SByte(v)) => encoder.write_sbyte(field, *v),
            (BuiltinType::Byte, Value::Byte(v)) => encoder.write_byte(field, *v),
            (BuiltinType::Int16, Value::Int16(v)) => encoder.write_int16(field, *v),
            (BuiltinType::UInt16, Value::UInt16(v)) => encoder.write_uint16(field, *v),
            (BuiltinType::Int32, Value::Int32(v)) => encoder.write_int32(field, *v),
            (BuiltinType::UInt32, Value::UInt32(v)) => encoder.write_uint32(field, *v),
            (BuiltinType::Int64, Value::Int64(v)) => encoder.write_int64(field, *v),
            (BuiltinType::UInt64, Value::UInt64(v)) => encoder.write_uint64(field, *v),
            (BuiltinType::Float, Value::Float(v)) => encoder.write_float(field, *v),
            (BuiltinType::Double, Value::Double(v)) => encoder.write_double(field, *v),
            (BuiltinType::String, Value::String(v)) => encoder.write_string(field, v),
            (BuiltinType::DateTime, Value::DateTime(v)) => encoder.write_date_time(field, *v),
            (BuiltinType::Guid, Value::Guid(v)) => encoder.write_guid(field, v),
            (BuiltinType::ByteString, Value::ByteString(v)) => {
                encoder.write_byte_string(field, v)
            }
            (BuiltinType::XmlElement, Value::XmlElement(v)) => {
                encoder.write_xml_element(field, v)
            }
            (BuiltinType::NodeId, Value::NodeId(v)) => encoder.write_node_id(field, v),
            (BuiltinType::ExpandedNodeId, Value::ExpandedNodeId(v)) => {
                encoder.write_expanded_node_id(field, v)
            }
            (BuiltinType::StatusCode, Value::StatusCode(v)) => {
                encoder.write_status_code(field, *v)
            }
            (BuiltinType::QualifiedName, Value::QualifiedName(v)) => {
                encoder.write_qualified_name(field, v)
            }
            (BuiltinType::LocalizedText, Value::LocalizedText(v)) => {
                encoder.write_localized_text(field, v)
            }
            (
                BuiltinType::ExtensionObject
                | BuiltinType::DataValue
                | BuiltinType::Variant
                | BuiltinType::DiagnosticInfo,
                _,
            ) => Err(EncodeError::Unsupported(builtin_unsupported(*builtin))),
            (builtin, v) => Err(kind_mismatch(field, builtin.name(), v)),
        },
        (FieldKind::Enumeration, v) => Err(kind_mismatch(field, "Enumeration", v)),
    }
}

fn kind_mismatch(field: Option<&str>, expected: &str, found: &Value) -> EncodeError {
    EncodeError::SchemaMismatch(format!(
        "{} expects {expected}, found {}",
        field.map_or_else(|| "array element".to_owned(), |f| format!("field '{f}'")),
        found.kind_name()
    ))
}

/// Reads a value of the structured type `data_type`.
///
/// Concrete registered structures are read inline. Abstract types are read
/// as extension objects whose encoding id selects the concrete codec; a
/// null extension object reads as [`Value::Null`].
pub fn read_struct(
    decoder: &mut dyn Decoder,
    field: Option<&str>,
    data_type: &ExpandedNodeId,
) -> Result<Value, DecodeError> {
    let ctx = decoder.context().clone();
    match ctx.registry().field_kind(data_type) {
        Some(FieldKind::Structure(type_id)) => {
            let entry = ctx
                .registry()
                .entry(&type_id)
                .ok_or_else(|| DecodeError::UnknownDataType(type_id.to_string()))?;
            decoder.begin_struct(field)?;
            let value = entry.codec().decode(&ctx, decoder)?;
            decoder.end_struct()?;
            Ok(Value::from(value))
        }
        Some(FieldKind::ExtensionObject(declared)) => {
            read_extension_object(decoder, &ctx, field, &declared)
        }
        _ => Err(DecodeError::UnknownDataType(data_type.to_string())),
    }
}

pub fn read_struct_array(
    decoder: &mut dyn Decoder,
    field: Option<&str>,
    data_type: &ExpandedNodeId,
) -> Result<Value, DecodeError> {
    let Some(len) = decoder.begin_array(field)? else {
        return Ok(Value::Array(None));
    };
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATED_ITEMS));
    for _ in 0..len {
        items.push(decoder.read_struct(None, data_type)?);
    }
    decoder.end_array()?;
    Ok(Value::Array(Some(items)))
}

fn read_extension_object(
    decoder: &mut dyn Decoder,
    ctx: &EncodingContext,
    field: Option<&str>,
    declared: &ExpandedNodeId,
) -> Result<Value, DecodeError> {
    let Some(encoding_id) = decoder.begin_extension_object(field)? else {
        return Ok(Value::Null);
    };
    let canonical = ctx.namespaces().resolve(&encoding_id)?;
    let entry = match ctx.registry().lookup_entry(&canonical) {
        Some((entry, format)) if format == decoder.format() => entry,
        Some((_, format)) => {
            log::debug!(
                "encoding id {encoding_id} is a {format} encoding, not {}",
                decoder.format()
            );
            return Err(DecodeError::UnknownEncodingIdentity(encoding_id.to_string()));
        }
        None => {
            log::debug!("no codec registered for encoding id {canonical}");
            return Err(DecodeError::UnknownEncodingIdentity(encoding_id.to_string()));
        }
    };
    if !ctx.registry().is_subtype_of(&entry.identity().type_id, declared) {
        return Err(DecodeError::NotASubtype {
            expected: declared.to_string(),
            found: entry.name().to_owned(),
        });
    }
    let value = entry.codec().decode(ctx, decoder)?;
    decoder.end_extension_object()?;
    Ok(Value::from(value))
}

/// Writes `value` as the structured type `data_type`; the counterpart of
/// [`read_struct`].
pub fn write_struct(
    encoder: &mut dyn Encoder,
    field: Option<&str>,
    value: &Value,
    data_type: &ExpandedNodeId,
) -> Result<(), EncodeError> {
    let ctx = encoder.context().clone();
    match ctx.registry().field_kind(data_type) {
        Some(FieldKind::Structure(type_id)) => {
            let Value::Struct(s) = value else {
                return Err(EncodeError::SchemaMismatch(format!(
                    "expected structure {type_id}, found {}",
                    value.kind_name()
                )));
            };
            let entry = ctx
                .registry()
                .entry(&type_id)
                .ok_or_else(|| EncodeError::UnknownDataType(type_id.to_string()))?;
            if ctx.registry().canonical(s.type_id()).as_ref() != Some(&type_id) {
                return Err(EncodeError::SchemaMismatch(format!(
                    "expected {}, found value of type {}",
                    entry.name(),
                    s.type_id()
                )));
            }
            write_inline(encoder, &ctx, field, entry, s)
        }
        Some(FieldKind::ExtensionObject(declared)) => match value {
            Value::Null => encoder.write_null_extension_object(field),
            Value::Struct(s) => write_extension_object(encoder, &ctx, field, s, &declared),
            other => Err(EncodeError::SchemaMismatch(format!(
                "expected extension object, found {}",
                other.kind_name()
            ))),
        },
        _ => Err(EncodeError::UnknownDataType(data_type.to_string())),
    }
}

pub fn write_struct_array(
    encoder: &mut dyn Encoder,
    field: Option<&str>,
    value: &Value,
    data_type: &ExpandedNodeId,
) -> Result<(), EncodeError> {
    match value {
        Value::Array(None) => encoder.write_null_array(field),
        Value::Array(Some(items)) => {
            encoder.begin_array(field, items.len())?;
            for item in items {
                encoder.write_struct(None, item, data_type)?;
            }
            encoder.end_array()
        }
        other => Err(EncodeError::SchemaMismatch(format!(
            "expected array, found {}",
            other.kind_name()
        ))),
    }
}

fn write_inline(
    encoder: &mut dyn Encoder,
    ctx: &EncodingContext,
    field: Option<&str>,
    entry: &CodecEntry,
    value: &StructValue,
) -> Result<(), EncodeError> {
    encoder.begin_struct(field, entry.name())?;
    entry.codec().encode(ctx, encoder, value)?;
    encoder.end_struct()
}

fn write_extension_object(
    encoder: &mut dyn Encoder,
    ctx: &EncodingContext,
    field: Option<&str>,
    value: &StructValue,
    declared: &ExpandedNodeId,
) -> Result<(), EncodeError> {
    let entry = ctx
        .registry()
        .entry(value.type_id())
        .ok_or_else(|| EncodeError::UnknownDataType(value.type_id().to_string()))?;
    if !ctx.registry().is_subtype_of(&entry.identity().type_id, declared) {
        return Err(EncodeError::SchemaMismatch(format!(
            "{} is not a subtype of {declared}",
            entry.name()
        )));
    }
    let encoding_id = entry
        .identity()
        .encoding_id(encoder.format())
        .to_node_id(ctx.namespaces())?;
    encoder.begin_extension_object(field, &encoding_id, entry.name())?;
    entry.codec().encode(ctx, encoder, value)?;
    encoder.end_extension_object()
}

/// Decodes a document whose root is a value of `type_id`.
pub(crate) fn decode_root(
    decoder: &mut dyn Decoder,
    type_id: &ExpandedNodeId,
) -> Result<StructValue, DecodeError> {
    match decoder.read_struct(None, type_id)? {
        Value::Struct(value) => Ok(*value),
        _ => Err(DecodeError::Unsupported(
            "null extension object at the document root",
        )),
    }
}

/// Encodes `value` inline as the document root.
pub(crate) fn encode_root(encoder: &mut dyn Encoder, value: &StructValue) -> Result<(), EncodeError> {
    let ctx = encoder.context().clone();
    let entry = ctx
        .registry()
        .entry(value.type_id())
        .ok_or_else(|| EncodeError::UnknownDataType(value.type_id().to_string()))?;
    write_inline(encoder, &ctx, None, entry, value)
}

use crate::types::{
    ByteString, DateTime, ExpandedNodeId, Guid, LocalizedText, NodeId, QualifiedName, StatusCode,
    UaString, XmlElement,
};

/// A decoded value of any supported built-in kind, a structure, or an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(UaString),
    DateTime(DateTime),
    Guid(Guid),
    ByteString(ByteString),
    XmlElement(XmlElement),
    NodeId(NodeId),
    ExpandedNodeId(ExpandedNodeId),
    StatusCode(StatusCode),
    QualifiedName(QualifiedName),
    LocalizedText(LocalizedText),
    Enumeration(i32),
    Struct(Box<StructValue>),
    /// A homogeneous array; `None` is a null array, distinct from empty.
    Array(Option<Vec<Value>>),
    /// A null extension object.
    Null,
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::ByteString(_) => "ByteString",
            Self::XmlElement(_) => "XmlElement",
            Self::NodeId(_) => "NodeId",
            Self::ExpandedNodeId(_) => "ExpandedNodeId",
            Self::StatusCode(_) => "StatusCode",
            Self::QualifiedName(_) => "QualifiedName",
            Self::LocalizedText(_) => "LocalizedText",
            Self::Enumeration(_) => "Enumeration",
            Self::Struct(_) => "Structure",
            Self::Array(_) => "Array",
            Self::Null => "Null",
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(Some(items)) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => s.as_str(),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    &str => String,
    String => String,
    UaString => String,
    DateTime => DateTime,
    Guid => Guid,
    ByteString => ByteString,
    XmlElement => XmlElement,
    NodeId => NodeId,
    ExpandedNodeId => ExpandedNodeId,
    StatusCode => StatusCode,
    QualifiedName => QualifiedName,
    LocalizedText => LocalizedText,
}

impl From<StructValue> for Value {
    fn from(value: StructValue) -> Self {
        Self::Struct(Box::new(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(Some(value))
    }
}

/// One named field of a [`StructValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// `None` for an omitted optional field or an unselected union arm.
    pub value: Option<Value>,
}

/// An instance of a structured type: one value per schema field, in
/// schema order, tagged with the type's logical identity.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    type_id: ExpandedNodeId,
    fields: Vec<Field>,
}

impl StructValue {
    pub fn new(type_id: ExpandedNodeId, fields: Vec<Field>) -> Self {
        Self { type_id, fields }
    }

    pub fn builder(type_id: ExpandedNodeId) -> StructValueBuilder {
        StructValueBuilder {
            type_id,
            fields: Vec::new(),
        }
    }

    pub fn type_id(&self) -> &ExpandedNodeId {
        &self.type_id
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The value of the named field, or `None` when absent or unknown.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.as_ref())
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }
}

/// Collects fields in schema order before freezing them into a [`StructValue`].
#[derive(Debug, Clone)]
pub struct StructValueBuilder {
    type_id: ExpandedNodeId,
    fields: Vec<Field>,
}

impl StructValueBuilder {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Records an optional field (or union arm) as absent.
    pub fn absent(mut self, name: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: None,
        });
        self
    }

    pub fn build(self) -> StructValue {
        StructValue::new(self.type_id, self.fields)
    }
}

use crate::types::NodeId;

/// The OPC UA built-in data types, numbered by their namespace-0 node id.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BuiltinType {
    Boolean = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    String = 12,
    DateTime = 13,
    Guid = 14,
    ByteString = 15,
    XmlElement = 16,
    NodeId = 17,
    ExpandedNodeId = 18,
    StatusCode = 19,
    QualifiedName = 20,
    LocalizedText = 21,
    ExtensionObject = 22,
    DataValue = 23,
    Variant = 24,
    DiagnosticInfo = 25,
}

impl BuiltinType {
    pub const fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Boolean,
            2 => Self::SByte,
            3 => Self::Byte,
            4 => Self::Int16,
            5 => Self::UInt16,
            6 => Self::Int32,
            7 => Self::UInt32,
            8 => Self::Int64,
            9 => Self::UInt64,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::String,
            13 => Self::DateTime,
            14 => Self::Guid,
            15 => Self::ByteString,
            16 => Self::XmlElement,
            17 => Self::NodeId,
            18 => Self::ExpandedNodeId,
            19 => Self::StatusCode,
            20 => Self::QualifiedName,
            21 => Self::LocalizedText,
            22 => Self::ExtensionObject,
            23 => Self::DataValue,
            24 => Self::Variant,
            25 => Self::DiagnosticInfo,
            _ => return None,
        })
    }

    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn node_id(self) -> NodeId {
        NodeId::numeric(0, self as u32)
    }

    /// Element name used by the XML encoding for unnamed values of this type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::XmlElement => "XmlElement",
            Self::NodeId => "NodeId",
            Self::ExpandedNodeId => "ExpandedNodeId",
            Self::StatusCode => "StatusCode",
            Self::QualifiedName => "QualifiedName",
            Self::LocalizedText => "LocalizedText",
            Self::ExtensionObject => "ExtensionObject",
            Self::DataValue => "DataValue",
            Self::Variant => "Variant",
            Self::DiagnosticInfo => "DiagnosticInfo",
        }
    }
}

/// Namespace-0 node id of the abstract `Enumeration` data type.
pub const ENUMERATION_TYPE_ID: u32 = 29;

/// Namespace-0 subtypes of built-in types that share their base's encoding.
pub(crate) const WELL_KNOWN_ALIASES: &[(u32, BuiltinType)] = &[
    (30, BuiltinType::ByteString),   // Image
    (288, BuiltinType::UInt32),      // IntegerId
    (289, BuiltinType::UInt32),      // Counter
    (290, BuiltinType::Double),      // Duration
    (291, BuiltinType::String),      // NumericRange
    (292, BuiltinType::String),      // Time
    (293, BuiltinType::DateTime),    // Date
    (294, BuiltinType::DateTime),    // UtcTime
    (295, BuiltinType::String),      // LocaleId
    (311, BuiltinType::ByteString),  // ApplicationInstanceCertificate
    (2000, BuiltinType::ByteString), // ImageBMP
    (2001, BuiltinType::ByteString), // ImageGIF
    (2002, BuiltinType::ByteString), // ImageJPG
    (2003, BuiltinType::ByteString), // ImagePNG
    (17588, BuiltinType::UInt32),    // Index
    (20998, BuiltinType::UInt32),    // VersionTime
];

use crate::types::{ExpandedNodeId, NamespaceTable};
use crate::NamespaceError;
use core::fmt;

/// The three wire encodings of a structured type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WireFormat {
    Binary,
    Xml,
    Json,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Binary => "binary",
            Self::Xml => "xml",
            Self::Json => "json",
        })
    }
}

/// The fixed identifiers of one structured type: its data type node and
/// the encoding nodes placed in extension-object envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeIdentity {
    pub type_id: ExpandedNodeId,
    pub binary: ExpandedNodeId,
    pub xml: ExpandedNodeId,
    pub json: ExpandedNodeId,
}

impl TypeIdentity {
    pub const fn new(
        type_id: ExpandedNodeId,
        binary: ExpandedNodeId,
        xml: ExpandedNodeId,
        json: ExpandedNodeId,
    ) -> Self {
        Self {
            type_id,
            binary,
            xml,
            json,
        }
    }

    /// Identity of a namespace-0 type from its four numeric ids.
    pub const fn ns0(type_id: u32, binary: u32, xml: u32, json: u32) -> Self {
        Self::new(
            ExpandedNodeId::numeric(0, type_id),
            ExpandedNodeId::numeric(0, binary),
            ExpandedNodeId::numeric(0, xml),
            ExpandedNodeId::numeric(0, json),
        )
    }

    pub fn encoding_id(&self, format: WireFormat) -> &ExpandedNodeId {
        match format {
            WireFormat::Binary => &self.binary,
            WireFormat::Xml => &self.xml,
            WireFormat::Json => &self.json,
        }
    }

    /// All four identifiers qualified by namespace URI.
    pub fn canonical(&self, table: &NamespaceTable) -> Result<Self, NamespaceError> {
        Ok(Self {
            type_id: self.type_id.canonical(table)?,
            binary: self.binary.canonical(table)?,
            xml: self.xml.canonical(table)?,
            json: self.json.canonical(table)?,
        })
    }
}

use crate::types::{LocalizedText, NodeId};

/// Value rank of a scalar field.
pub const VALUE_RANK_SCALAR: i32 = -1;
/// Value rank of a one-dimensional array field.
pub const VALUE_RANK_ONE_DIMENSION: i32 = 1;

/// How the fields of a structure are laid out on the wire.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructureType {
    /// Every field is always present.
    Structure = 0,
    /// Fields flagged optional may be omitted; binary carries a presence mask.
    StructureWithOptionalFields = 1,
    /// Exactly one field (or none) is present, selected by a switch value.
    Union = 2,
}

/// One field of a [`StructureDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureField {
    pub name: String,
    pub description: LocalizedText,
    /// Declared data type, relative to the namespace table the definition
    /// was produced for.
    pub data_type: NodeId,
    pub value_rank: i32,
    pub array_dimensions: Option<Vec<u32>>,
    pub max_string_length: u32,
    pub is_optional: bool,
}

impl StructureField {
    pub fn new(name: impl Into<String>, data_type: NodeId, value_rank: i32) -> Self {
        Self {
            name: name.into(),
            description: LocalizedText::NULL,
            data_type,
            value_rank,
            array_dimensions: None,
            max_string_length: 0,
            is_optional: false,
        }
    }

    pub fn scalar(name: impl Into<String>, data_type: NodeId) -> Self {
        Self::new(name, data_type, VALUE_RANK_SCALAR)
    }

    pub fn array(name: impl Into<String>, data_type: NodeId) -> Self {
        Self::new(name, data_type, VALUE_RANK_ONE_DIMENSION)
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn with_description(mut self, description: LocalizedText) -> Self {
        self.description = description;
        self
    }

    pub fn with_max_string_length(mut self, max: u32) -> Self {
        self.max_string_length = max;
        self
    }

    pub fn with_array_dimensions(mut self, dimensions: Vec<u32>) -> Self {
        self.array_dimensions = Some(dimensions);
        self
    }

    pub const fn is_array(&self) -> bool {
        self.value_rank == VALUE_RANK_ONE_DIMENSION
    }
}

/// The ordered field list of a structured type.
///
/// Field order is the binary wire order; field names are the member names
/// of the XML and JSON encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureDefinition {
    pub default_encoding_id: NodeId,
    pub base_data_type: NodeId,
    pub structure_type: StructureType,
    pub fields: Vec<StructureField>,
}

impl StructureDefinition {
    pub fn new(
        default_encoding_id: NodeId,
        base_data_type: NodeId,
        structure_type: StructureType,
        fields: Vec<StructureField>,
    ) -> Self {
        Self {
            default_encoding_id,
            base_data_type,
            structure_type,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&StructureField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{StructureDefinition, StructureField, StructureType, VALUE_RANK_SCALAR};
    use crate::types::{BuiltinType, NodeId};

    #[test]
    fn field_builders() {
        let f = StructureField::array("Values", BuiltinType::Int32.node_id()).optional();
        assert!(f.is_array());
        assert!(f.is_optional);

        let s = StructureField::scalar("Name", BuiltinType::String.node_id())
            .with_max_string_length(64);
        assert_eq!(s.value_rank, VALUE_RANK_SCALAR);
        assert_eq!(s.max_string_length, 64);
    }

    #[test]
    fn lookup_by_name() {
        let def = StructureDefinition::new(
            NodeId::numeric(1, 2),
            NodeId::numeric(0, 22),
            StructureType::Structure,
            vec![StructureField::scalar("A", BuiltinType::Boolean.node_id())],
        );
        assert!(def.field("A").is_some());
        assert!(def.field("B").is_none());
    }
}

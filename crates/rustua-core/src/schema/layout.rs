use crate::schema::{StructureDefinition, StructureType, VALUE_RANK_ONE_DIMENSION, VALUE_RANK_SCALAR};
use crate::types::{BuiltinType, ExpandedNodeId, NamespaceTable};
use crate::RegistryError;

/// Number of bits in the binary optional-field mask.
pub const MAX_OPTIONAL_FIELDS: usize = 32;

/// The wire shape of one field, resolved through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Builtin(BuiltinType),
    /// Any subtype of `Enumeration`, carried as its Int32 value.
    Enumeration,
    /// A concrete registered structure, encoded inline.
    Structure(ExpandedNodeId),
    /// An abstract declared type; instances travel as extension objects.
    ExtensionObject(ExpandedNodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub kind: FieldKind,
    pub is_array: bool,
    /// Only set for fields of a structure with optional fields.
    pub is_optional: bool,
}

/// A [`StructureDefinition`] with every field type resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureLayout {
    pub structure_type: StructureType,
    pub fields: Vec<FieldLayout>,
}

impl StructureLayout {
    /// Resolves each field of `definition` through `resolve`, which receives
    /// the canonical data type id.
    pub(crate) fn compile<F>(
        name: &str,
        definition: &StructureDefinition,
        namespaces: &NamespaceTable,
        mut resolve: F,
    ) -> Result<Self, RegistryError>
    where
        F: FnMut(&ExpandedNodeId) -> Option<FieldKind>,
    {
        let unsupported = |field: &str, what: String| RegistryError::UnsupportedField {
            structure: name.to_owned(),
            field: field.to_owned(),
            what,
        };

        let mut fields: Vec<FieldLayout> = Vec::with_capacity(definition.fields.len());
        for field in &definition.fields {
            if fields.iter().any(|f| f.name == field.name) {
                return Err(RegistryError::DuplicateField {
                    structure: name.to_owned(),
                    field: field.name.clone(),
                });
            }

            let is_array = match field.value_rank {
                VALUE_RANK_SCALAR => false,
                VALUE_RANK_ONE_DIMENSION => true,
                rank => return Err(unsupported(&field.name, format!("value rank {rank}"))),
            };

            let data_type = namespaces.resolve(&field.data_type)?;
            let kind = resolve(&data_type).ok_or_else(|| RegistryError::UnknownFieldType {
                structure: name.to_owned(),
                field: field.name.clone(),
                data_type: field.data_type.to_string(),
            })?;
            if let FieldKind::Builtin(
                t @ (BuiltinType::Variant | BuiltinType::DataValue | BuiltinType::DiagnosticInfo),
            ) = kind
            {
                return Err(unsupported(&field.name, format!("built-in type {}", t.name())));
            }

            fields.push(FieldLayout {
                name: field.name.clone(),
                kind,
                is_array,
                is_optional: definition.structure_type
                    == StructureType::StructureWithOptionalFields
                    && field.is_optional,
            });
        }

        let optional = fields.iter().filter(|f| f.is_optional).count();
        if optional > MAX_OPTIONAL_FIELDS {
            let last = fields
                .iter()
                .rev()
                .find(|f| f.is_optional)
                .map(|f| f.name.clone())
                .unwrap_or_default();
            return Err(unsupported(&last, format!("{optional} optional fields")));
        }

        Ok(Self {
            structure_type: definition.structure_type,
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the optional fields in mask-bit order.
    pub fn optional_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_optional)
            .map(|f| f.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKind, StructureLayout};
    use crate::schema::{StructureDefinition, StructureField, StructureType};
    use crate::types::{BuiltinType, ExpandedNodeId, NamespaceRef, NamespaceTable, NodeId};
    use crate::RegistryError;

    fn builtin(id: &ExpandedNodeId) -> Option<FieldKind> {
        match (&id.namespace, id.identifier.clone()) {
            (NamespaceRef::Uri(_), crate::types::Identifier::Numeric(n)) => {
                BuiltinType::from_u32(n).map(FieldKind::Builtin)
            }
            _ => None,
        }
    }

    fn definition(structure_type: StructureType, fields: Vec<StructureField>) -> StructureDefinition {
        StructureDefinition::new(
            NodeId::numeric(1, 2),
            NodeId::numeric(0, 22),
            structure_type,
            fields,
        )
    }

    #[test]
    fn optional_flag_ignored_outside_optional_structures() {
        let def = definition(
            StructureType::Structure,
            vec![StructureField::scalar("A", BuiltinType::Int32.node_id()).optional()],
        );
        let layout = StructureLayout::compile("T", &def, &NamespaceTable::new(), builtin).unwrap();
        assert!(!layout.fields[0].is_optional);
        assert!(layout.optional_field_names().is_empty());
    }

    #[test]
    fn rejects_duplicate_fields() {
        let def = definition(
            StructureType::Structure,
            vec![
                StructureField::scalar("A", BuiltinType::Int32.node_id()),
                StructureField::scalar("A", BuiltinType::Int32.node_id()),
            ],
        );
        let err = StructureLayout::compile("T", &def, &NamespaceTable::new(), builtin).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateField { .. }));
    }

    #[test]
    fn rejects_matrix_rank_and_variant() {
        let def = definition(
            StructureType::Structure,
            vec![StructureField::new("M", BuiltinType::Int32.node_id(), 2)],
        );
        let err = StructureLayout::compile("T", &def, &NamespaceTable::new(), builtin).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedField { .. }));

        let def = definition(
            StructureType::Structure,
            vec![StructureField::scalar("V", BuiltinType::Variant.node_id())],
        );
        let err = StructureLayout::compile("T", &def, &NamespaceTable::new(), builtin).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedField { .. }));
    }

    #[test]
    fn unknown_field_type_is_reported() {
        let def = definition(
            StructureType::Structure,
            vec![StructureField::scalar("X", NodeId::numeric(0, 99_999))],
        );
        let err = StructureLayout::compile("T", &def, &NamespaceTable::new(), builtin).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFieldType { .. }));
    }

    #[test]
    fn too_many_optional_fields() {
        let fields = (0..33)
            .map(|i| StructureField::scalar(format!("F{i}"), BuiltinType::Byte.node_id()).optional())
            .collect();
        let def = definition(StructureType::StructureWithOptionalFields, fields);
        let err = StructureLayout::compile("T", &def, &NamespaceTable::new(), builtin).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedField { .. }));
    }
}

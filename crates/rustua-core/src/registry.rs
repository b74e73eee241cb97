use crate::context::EncodingContext;
use crate::encoding::{Decoder, Encoder};
use crate::schema::{FieldKind, StructureDefinition, StructureLayout};
use crate::structure::GenericStructureCodec;
use crate::types::builtin::{ENUMERATION_TYPE_ID, WELL_KNOWN_ALIASES};
use crate::types::{
    BuiltinType, ExpandedNodeId, Identifier, NamespaceRef, NamespaceTable, NodeId, StructValue,
    TypeIdentity, WireFormat, OPC_UA_NAMESPACE_URI,
};
use crate::{DecodeError, EncodeError, RegistryError};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

const MAX_ALIAS_HOPS: usize = 16;
const MAX_SUBTYPE_DEPTH: usize = 32;

/// Encodes and decodes the body of one structured type.
///
/// Implementations are driven by a format-specific [`Decoder`] or
/// [`Encoder`] that is already positioned inside the structure; they
/// never see framing such as the extension-object envelope.
pub trait DataTypeCodec: Send + Sync + fmt::Debug {
    fn identity(&self) -> &TypeIdentity;

    /// Type name, used as the XML element name of unnamed instances.
    fn name(&self) -> &str;

    /// Parent data type, relative to the registration namespace table.
    ///
    /// Codecs without one are only accepted in fields declared as plain
    /// `Structure`.
    fn base_data_type(&self) -> Option<&NodeId> {
        None
    }

    fn decode(
        &self,
        ctx: &EncodingContext,
        decoder: &mut dyn Decoder,
    ) -> Result<StructValue, DecodeError>;

    fn encode(
        &self,
        ctx: &EncodingContext,
        encoder: &mut dyn Encoder,
        value: &StructValue,
    ) -> Result<(), EncodeError>;
}

/// A registered structure: its codec plus the URI-qualified identity used
/// for lookups.
#[derive(Debug)]
pub struct CodecEntry {
    name: String,
    identity: TypeIdentity,
    base_type: Option<ExpandedNodeId>,
    codec: Arc<dyn DataTypeCodec>,
}

impl CodecEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical identity: every id qualified by namespace URI.
    pub fn identity(&self) -> &TypeIdentity {
        &self.identity
    }

    /// URI-qualified parent type, if the codec declares one.
    pub fn base_type(&self) -> Option<&ExpandedNodeId> {
        self.base_type.as_ref()
    }

    pub fn codec(&self) -> &Arc<dyn DataTypeCodec> {
        &self.codec
    }
}

#[derive(Debug, Clone)]
enum DeclaredKind {
    Abstract(String),
    Enumeration(String),
    Alias(ExpandedNodeId),
}

/// Immutable mapping from type and encoding identities to codecs.
///
/// Built once through [`DataTypeRegistryBuilder`] and then shared, usually
/// behind an `Arc`, by any number of concurrent encoders and decoders.
/// Ids passed to the lookup methods may be index-qualified relative to the
/// registration namespace table or URI-qualified.
#[derive(Debug)]
pub struct DataTypeRegistry {
    namespaces: NamespaceTable,
    types: HashMap<ExpandedNodeId, Arc<CodecEntry>>,
    encodings: HashMap<ExpandedNodeId, (Arc<CodecEntry>, WireFormat)>,
    declared: HashMap<ExpandedNodeId, DeclaredKind>,
}

impl DataTypeRegistry {
    pub fn builder(namespaces: NamespaceTable) -> DataTypeRegistryBuilder {
        DataTypeRegistryBuilder::new(namespaces)
    }

    /// The namespace table the registered identities are relative to.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// URI-qualified form of `id`, or `None` if its index is unknown here.
    pub fn canonical(&self, id: &ExpandedNodeId) -> Option<ExpandedNodeId> {
        id.canonical(&self.namespaces).ok()
    }

    /// Registered structure for a data type id.
    pub fn entry(&self, type_id: &ExpandedNodeId) -> Option<&Arc<CodecEntry>> {
        self.types.get(&self.canonical(type_id)?)
    }

    /// Codec for a data type id; shorthand for [`entry`](Self::entry).
    pub fn codec(&self, type_id: &ExpandedNodeId) -> Option<&Arc<dyn DataTypeCodec>> {
        self.entry(type_id).map(|e| e.codec())
    }

    /// Whether `type_id` is `ancestor` or derives from it through the base
    /// types of registered structures. Everything derives from `Structure`.
    pub fn is_subtype_of(&self, type_id: &ExpandedNodeId, ancestor: &ExpandedNodeId) -> bool {
        let Some(ancestor) = self.canonical(ancestor) else {
            return false;
        };
        if ns0_numeric(&ancestor) == Some(BuiltinType::ExtensionObject.to_u32()) {
            return true;
        }
        let mut current = self.canonical(type_id);
        for _ in 0..MAX_SUBTYPE_DEPTH {
            let Some(id) = current else {
                return false;
            };
            if id == ancestor {
                return true;
            }
            current = self.types.get(&id).and_then(|e| e.base_type.clone());
        }
        false
    }

    /// Finds the codec registered under an encoding identity and reports
    /// which wire format that identity belongs to.
    pub fn lookup(
        &self,
        encoding_id: &ExpandedNodeId,
    ) -> Option<(&Arc<dyn DataTypeCodec>, WireFormat)> {
        self.lookup_entry(encoding_id)
            .map(|(entry, format)| (entry.codec(), format))
    }

    pub fn lookup_entry(
        &self,
        encoding_id: &ExpandedNodeId,
    ) -> Option<(&Arc<CodecEntry>, WireFormat)> {
        self.encodings
            .get(&self.canonical(encoding_id)?)
            .map(|(entry, format)| (entry, *format))
    }

    /// How a field declared with `data_type` is carried on the wire.
    pub fn field_kind(&self, data_type: &ExpandedNodeId) -> Option<FieldKind> {
        let id = self.canonical(data_type)?;
        resolve_kind(&self.declared, |t| self.types.contains_key(t), &id)
    }

    pub fn type_name(&self, type_id: &ExpandedNodeId) -> Option<&str> {
        let id = self.canonical(type_id)?;
        if let Some(entry) = self.types.get(&id) {
            return Some(entry.name());
        }
        match self.declared.get(&id)? {
            DeclaredKind::Abstract(name) | DeclaredKind::Enumeration(name) => Some(name),
            DeclaredKind::Alias(_) => None,
        }
    }

    /// Every registered structure, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<CodecEntry>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn ns0_numeric(id: &ExpandedNodeId) -> Option<u32> {
    match (&id.namespace, &id.identifier) {
        (NamespaceRef::Uri(uri), Identifier::Numeric(n))
            if id.server_index == 0 && uri == OPC_UA_NAMESPACE_URI =>
        {
            Some(*n)
        }
        _ => None,
    }
}

fn base_type(
    codec: &dyn DataTypeCodec,
    namespaces: &NamespaceTable,
) -> Result<Option<ExpandedNodeId>, RegistryError> {
    match codec.base_data_type() {
        Some(base) if !base.is_null() => Ok(Some(namespaces.resolve(base)?)),
        _ => Ok(None),
    }
}

fn resolve_kind<F>(
    declared: &HashMap<ExpandedNodeId, DeclaredKind>,
    is_structure: F,
    id: &ExpandedNodeId,
) -> Option<FieldKind>
where
    F: Fn(&ExpandedNodeId) -> bool,
{
    let mut current = id;
    for _ in 0..MAX_ALIAS_HOPS {
        if let Some(n) = ns0_numeric(current) {
            match BuiltinType::from_u32(n) {
                Some(BuiltinType::ExtensionObject) => {
                    return Some(FieldKind::ExtensionObject(current.clone()))
                }
                Some(builtin) => return Some(FieldKind::Builtin(builtin)),
                None if n == ENUMERATION_TYPE_ID => return Some(FieldKind::Enumeration),
                None => {}
            }
        }
        if is_structure(current) {
            return Some(FieldKind::Structure(current.clone()));
        }
        match declared.get(current)? {
            DeclaredKind::Abstract(_) => return Some(FieldKind::ExtensionObject(current.clone())),
            DeclaredKind::Enumeration(_) => return Some(FieldKind::Enumeration),
            DeclaredKind::Alias(base) => current = base,
        }
    }
    None
}

/// Collects type registrations and validates them into a [`DataTypeRegistry`].
///
/// Namespace-0 aliases of built-in types (Duration, UtcTime, LocaleId and
/// friends) are known without registration.
#[derive(Debug)]
pub struct DataTypeRegistryBuilder {
    namespaces: NamespaceTable,
    structures: Vec<(String, TypeIdentity, StructureDefinition)>,
    codecs: Vec<Arc<dyn DataTypeCodec>>,
    declared: Vec<(ExpandedNodeId, DeclaredKind)>,
}

impl DataTypeRegistryBuilder {
    pub fn new(namespaces: NamespaceTable) -> Self {
        Self {
            namespaces,
            structures: Vec::new(),
            codecs: Vec::new(),
            declared: Vec::new(),
        }
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Registers a structure served by the generic structure codec.
    pub fn register_structure(
        mut self,
        name: impl Into<String>,
        identity: TypeIdentity,
        definition: StructureDefinition,
    ) -> Self {
        self.structures.push((name.into(), identity, definition));
        self
    }

    /// Registers a hand-written codec.
    pub fn register_codec(mut self, codec: Arc<dyn DataTypeCodec>) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Declares an abstract type; fields of this type carry extension objects.
    pub fn register_abstract(mut self, name: impl Into<String>, type_id: ExpandedNodeId) -> Self {
        self.declared
            .push((type_id, DeclaredKind::Abstract(name.into())));
        self
    }

    pub fn register_enumeration(
        mut self,
        name: impl Into<String>,
        type_id: ExpandedNodeId,
    ) -> Self {
        self.declared
            .push((type_id, DeclaredKind::Enumeration(name.into())));
        self
    }

    /// Declares `type_id` as encoded exactly like `base`.
    pub fn register_alias(mut self, type_id: ExpandedNodeId, base: ExpandedNodeId) -> Self {
        self.declared.push((type_id, DeclaredKind::Alias(base)));
        self
    }

    pub fn build(self) -> Result<DataTypeRegistry, RegistryError> {
        let namespaces = self.namespaces;

        let mut declared = HashMap::new();
        for (id, kind) in self.declared {
            let key = id.canonical(&namespaces)?;
            let kind = match kind {
                DeclaredKind::Alias(base) => DeclaredKind::Alias(base.canonical(&namespaces)?),
                other => other,
            };
            if declared.insert(key.clone(), kind).is_some() {
                return Err(RegistryError::DuplicateType(key.to_string()));
            }
        }
        for (alias, builtin) in WELL_KNOWN_ALIASES {
            let key = ExpandedNodeId::numeric(0, *alias).canonical(&namespaces)?;
            let base = ExpandedNodeId::numeric(0, builtin.to_u32()).canonical(&namespaces)?;
            declared.entry(key).or_insert(DeclaredKind::Alias(base));
        }

        let mut structure_ids = HashSet::new();
        let mut claim = |identity: &TypeIdentity| -> Result<TypeIdentity, RegistryError> {
            let canonical = identity.canonical(&namespaces)?;
            if declared.contains_key(&canonical.type_id)
                || !structure_ids.insert(canonical.type_id.clone())
            {
                return Err(RegistryError::DuplicateType(canonical.type_id.to_string()));
            }
            Ok(canonical)
        };

        let mut pending = Vec::with_capacity(self.structures.len() + self.codecs.len());
        let mut generic = Vec::with_capacity(self.structures.len());
        for (name, identity, definition) in self.structures {
            let canonical = claim(&identity)?;
            generic.push((name, identity, canonical, definition));
        }
        for codec in self.codecs {
            let canonical = claim(codec.identity())?;
            pending.push(CodecEntry {
                name: codec.name().to_owned(),
                identity: canonical,
                base_type: base_type(codec.as_ref(), &namespaces)?,
                codec,
            });
        }

        for (alias, kind) in &declared {
            if let DeclaredKind::Alias(_) = kind {
                if resolve_kind(&declared, |t| structure_ids.contains(t), alias).is_none() {
                    return Err(RegistryError::UnresolvedAlias(alias.to_string()));
                }
            }
        }

        for (name, identity, canonical, definition) in generic {
            let layout = StructureLayout::compile(&name, &definition, &namespaces, |id| {
                resolve_kind(&declared, |t| structure_ids.contains(t), id)
            })?;
            log::trace!("compiled layout for {name}: {} fields", layout.fields.len());
            let codec = GenericStructureCodec::new(name.clone(), identity, definition, layout);
            pending.push(CodecEntry {
                name,
                identity: canonical,
                base_type: base_type(&codec, &namespaces)?,
                codec: Arc::new(codec),
            });
        }

        let mut types = HashMap::with_capacity(pending.len());
        let mut encodings = HashMap::with_capacity(pending.len() * 3);
        for entry in pending {
            let entry = Arc::new(entry);
            for format in [WireFormat::Binary, WireFormat::Xml, WireFormat::Json] {
                let encoding_id = entry.identity().encoding_id(format).clone();
                if encodings
                    .insert(encoding_id.clone(), (Arc::clone(&entry), format))
                    .is_some()
                {
                    return Err(RegistryError::DuplicateEncoding(encoding_id.to_string()));
                }
            }
            types.insert(entry.identity().type_id.clone(), entry);
        }

        log::debug!(
            "data type registry built with {} structures and {} declared types",
            types.len(),
            declared.len()
        );

        Ok(DataTypeRegistry {
            namespaces,
            types,
            encodings,
            declared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::DataTypeRegistry;
    use crate::schema::{FieldKind, StructureDefinition, StructureField, StructureType};
    use crate::types::{
        BuiltinType, ExpandedNodeId, Identifier, NamespaceTable, NodeId, TypeIdentity, WireFormat,
    };
    use crate::RegistryError;

    const APP: &str = "urn:rustua:test";

    fn namespaces() -> NamespaceTable {
        NamespaceTable::with_uris([APP]).unwrap()
    }

    fn identity(base: u32) -> TypeIdentity {
        TypeIdentity::new(
            ExpandedNodeId::numeric(1, base),
            ExpandedNodeId::numeric(1, base + 1),
            ExpandedNodeId::numeric(1, base + 2),
            ExpandedNodeId::numeric(1, base + 3),
        )
    }

    fn point() -> StructureDefinition {
        StructureDefinition::new(
            NodeId::numeric(1, 101),
            NodeId::numeric(0, 22),
            StructureType::Structure,
            vec![
                StructureField::scalar("X", BuiltinType::Double.node_id()),
                StructureField::scalar("Y", BuiltinType::Double.node_id()),
            ],
        )
    }

    fn derived(encoding: u32, base: NodeId) -> StructureDefinition {
        StructureDefinition::new(
            NodeId::numeric(1, encoding),
            base,
            StructureType::Structure,
            vec![StructureField::scalar("R", BuiltinType::Double.node_id())],
        )
    }

    #[test]
    fn subtypes_follow_registered_base_types() {
        let registry = DataTypeRegistry::builder(namespaces())
            .register_structure("Point", identity(100), point())
            .register_abstract("Shape", ExpandedNodeId::numeric(1, 200))
            .register_structure("Circle", identity(210), derived(211, NodeId::numeric(1, 200)))
            .register_structure("Ring", identity(220), derived(221, NodeId::numeric(1, 210)))
            .build()
            .unwrap();
        let shape = ExpandedNodeId::numeric(1, 200);
        let structure = ExpandedNodeId::numeric(0, 22);

        assert!(registry.is_subtype_of(&ExpandedNodeId::numeric(1, 210), &shape));
        assert!(registry.is_subtype_of(&ExpandedNodeId::numeric(1, 220), &shape));
        assert!(!registry.is_subtype_of(&ExpandedNodeId::numeric(1, 100), &shape));
        assert!(registry.is_subtype_of(&ExpandedNodeId::numeric(1, 100), &structure));
        assert_eq!(
            registry.entry(&ExpandedNodeId::numeric(1, 220)).unwrap().base_type(),
            Some(&ExpandedNodeId::with_uri(APP, Identifier::Numeric(210)))
        );
    }

    #[test]
    fn lookup_by_any_encoding_identity() {
        let registry = DataTypeRegistry::builder(namespaces())
            .register_structure("Point", identity(100), point())
            .build()
            .unwrap();

        let (codec, format) = registry.lookup(&ExpandedNodeId::numeric(1, 103)).unwrap();
        assert_eq!(format, WireFormat::Json);
        assert_eq!(codec.name(), "Point");

        let by_uri = ExpandedNodeId::with_uri(APP, Identifier::Numeric(101));
        assert_eq!(registry.lookup(&by_uri).unwrap().1, WireFormat::Binary);
        assert!(registry.lookup(&ExpandedNodeId::numeric(1, 999)).is_none());
        assert!(registry.lookup(&ExpandedNodeId::numeric(7, 101)).is_none());
    }

    #[test]
    fn field_kinds_resolve_aliases_and_abstracts() {
        let registry = DataTypeRegistry::builder(namespaces())
            .register_structure("Point", identity(100), point())
            .register_abstract("Shape", ExpandedNodeId::numeric(1, 200))
            .register_enumeration("Color", ExpandedNodeId::numeric(1, 300))
            .register_alias(ExpandedNodeId::numeric(1, 400), ExpandedNodeId::numeric(1, 100))
            .build()
            .unwrap();

        // Duration
        assert_eq!(
            registry.field_kind(&ExpandedNodeId::numeric(0, 290)),
            Some(FieldKind::Builtin(BuiltinType::Double))
        );
        assert!(matches!(
            registry.field_kind(&ExpandedNodeId::numeric(1, 200)),
            Some(FieldKind::ExtensionObject(_))
        ));
        assert!(matches!(
            registry.field_kind(&ExpandedNodeId::numeric(0, 22)),
            Some(FieldKind::ExtensionObject(_))
        ));
        assert_eq!(
            registry.field_kind(&ExpandedNodeId::numeric(1, 300)),
            Some(FieldKind::Enumeration)
        );
        assert_eq!(
            registry.field_kind(&ExpandedNodeId::numeric(1, 400)),
            Some(FieldKind::Structure(ExpandedNodeId::with_uri(
                APP,
                Identifier::Numeric(100)
            )))
        );
        assert_eq!(registry.type_name(&ExpandedNodeId::numeric(1, 300)), Some("Color"));
    }

    #[test]
    fn duplicate_type_and_encoding_rejected() {
        let err = DataTypeRegistry::builder(namespaces())
            .register_structure("Point", identity(100), point())
            .register_structure("Point2", identity(100), point())
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType(_)));

        let mut clash = identity(500);
        clash.json = ExpandedNodeId::numeric(1, 103);
        let err = DataTypeRegistry::builder(namespaces())
            .register_structure("Point", identity(100), point())
            .register_structure("Other", clash, point())
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEncoding(_)));
    }

    #[test]
    fn unknown_namespace_index_rejected() {
        let err = DataTypeRegistry::builder(NamespaceTable::new())
            .register_structure("Point", identity(100), point())
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::Namespace(_)));
    }

    #[test]
    fn dangling_alias_rejected() {
        let err = DataTypeRegistry::builder(namespaces())
            .register_alias(ExpandedNodeId::numeric(1, 1), ExpandedNodeId::numeric(1, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnresolvedAlias(_)));
    }

    #[test]
    fn unknown_field_type_rejected() {
        let def = StructureDefinition::new(
            NodeId::numeric(1, 101),
            NodeId::numeric(0, 22),
            StructureType::Structure,
            vec![StructureField::scalar("Shape", NodeId::numeric(1, 200))],
        );
        let err = DataTypeRegistry::builder(namespaces())
            .register_structure("Holder", identity(100), def)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFieldType { .. }));
    }
}

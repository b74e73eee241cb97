use crate::limits::EncodingLimits;
use crate::registry::DataTypeRegistry;
use crate::types::NamespaceTable;
use std::sync::Arc;

/// Everything a codec needs besides the bytes: the peer's namespace table,
/// the type registry and the limits to enforce.
///
/// Cloning is cheap; every encoder and decoder owns one.
#[derive(Debug, Clone)]
pub struct EncodingContext {
    namespaces: Arc<NamespaceTable>,
    registry: Arc<DataTypeRegistry>,
    limits: EncodingLimits,
}

impl EncodingContext {
    pub fn new(namespaces: Arc<NamespaceTable>, registry: Arc<DataTypeRegistry>) -> Self {
        Self {
            namespaces,
            registry,
            limits: EncodingLimits::default(),
        }
    }

    /// A context whose namespace table is the registry's own.
    pub fn for_registry(registry: Arc<DataTypeRegistry>) -> Self {
        let namespaces = Arc::new(registry.namespaces().clone());
        Self::new(namespaces, registry)
    }

    pub fn with_limits(mut self, limits: EncodingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_namespaces(mut self, namespaces: Arc<NamespaceTable>) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Namespace table that wire-level indices refer to.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub fn registry(&self) -> &DataTypeRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &EncodingLimits {
        &self.limits
    }
}

use crate::types::{Identifier, NamespaceTable, NodeId};
use crate::{DecodeError, NamespaceError};
use core::fmt;
use core::str::FromStr;

/// How an [`ExpandedNodeId`] names its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceRef {
    /// An index, meaningful only together with a namespace table.
    Index(u16),
    /// A namespace URI, independent of any index assignment.
    Uri(String),
}

/// A node identifier that may name its namespace by URI and point at
/// another server.
///
/// The form with [`NamespaceRef::Uri`] is the canonical one: it compares
/// equal across systems whose namespace tables assign different indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedNodeId {
    pub namespace: NamespaceRef,
    pub identifier: Identifier,
    pub server_index: u32,
}

impl ExpandedNodeId {
    pub const fn numeric(namespace: u16, id: u32) -> Self {
        Self {
            namespace: NamespaceRef::Index(namespace),
            identifier: Identifier::Numeric(id),
            server_index: 0,
        }
    }

    pub fn with_uri(uri: impl Into<String>, identifier: Identifier) -> Self {
        Self {
            namespace: NamespaceRef::Uri(uri.into()),
            identifier,
            server_index: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.server_index == 0
            && match &self.namespace {
                NamespaceRef::Index(ns) => NodeId {
                    namespace: *ns,
                    identifier: self.identifier.clone(),
                }
                .is_null(),
                NamespaceRef::Uri(_) => false,
            }
    }

    /// Rewrites an index-qualified identifier into its URI-qualified form.
    pub fn canonical(&self, table: &NamespaceTable) -> Result<Self, NamespaceError> {
        match &self.namespace {
            NamespaceRef::Uri(_) => Ok(self.clone()),
            NamespaceRef::Index(index) => {
                let uri = table
                    .uri_for(*index)
                    .ok_or(NamespaceError::IndexOutOfBounds(*index))?;
                Ok(Self {
                    namespace: NamespaceRef::Uri(uri.to_owned()),
                    identifier: self.identifier.clone(),
                    server_index: self.server_index,
                })
            }
        }
    }

    /// Maps to a [`NodeId`] using the indices of `table`.
    pub fn to_node_id(&self, table: &NamespaceTable) -> Result<NodeId, NamespaceError> {
        let namespace = match &self.namespace {
            NamespaceRef::Index(index) => *index,
            NamespaceRef::Uri(uri) => table
                .index_of(uri)
                .ok_or_else(|| NamespaceError::UnknownUri(uri.clone()))?,
        };
        Ok(NodeId {
            namespace,
            identifier: self.identifier.clone(),
        })
    }
}

impl Default for ExpandedNodeId {
    fn default() -> Self {
        Self::numeric(0, 0)
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(value: NodeId) -> Self {
        Self {
            namespace: NamespaceRef::Index(value.namespace),
            identifier: value.identifier,
            server_index: 0,
        }
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        match &self.namespace {
            NamespaceRef::Index(0) => {}
            NamespaceRef::Index(ns) => write!(f, "ns={ns};")?,
            NamespaceRef::Uri(uri) => write!(f, "nsu={uri};")?,
        }
        write!(f, "{}", self.identifier)
    }
}

impl FromStr for ExpandedNodeId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let mut server_index = 0;
        if let Some(after) = rest.strip_prefix("svr=") {
            let (svr, tail) = after.split_once(';').ok_or_else(|| {
                DecodeError::malformed("ExpandedNodeId", format!("'{s}' is missing ';'"))
            })?;
            server_index = svr
                .parse::<u32>()
                .map_err(|e| DecodeError::malformed("ExpandedNodeId", format!("'{s}': {e}")))?;
            rest = tail;
        }
        if let Some(after) = rest.strip_prefix("nsu=") {
            let (uri, tail) = after.split_once(';').ok_or_else(|| {
                DecodeError::malformed("ExpandedNodeId", format!("'{s}' is missing ';'"))
            })?;
            return Ok(Self {
                namespace: NamespaceRef::Uri(uri.to_owned()),
                identifier: Identifier::parse(tail)?,
                server_index,
            });
        }
        let mut id = Self::from(rest.parse::<NodeId>()?);
        id.server_index = server_index;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ExpandedNodeId, NamespaceRef};
    use crate::types::{Identifier, NamespaceTable, NodeId};
    use crate::NamespaceError;

    #[test]
    fn text_form_roundtrip() {
        for text in ["i=23866", "ns=2;s=Foo", "nsu=urn:acme;i=5", "svr=3;nsu=urn:acme;s=x"] {
            let id: ExpandedNodeId = text.parse().unwrap();
            assert_eq!(id.to_string(), text);
        }
    }

    #[test]
    fn canonical_form_is_table_independent() {
        let mut a = NamespaceTable::new();
        a.add("urn:acme").unwrap();
        let mut b = NamespaceTable::new();
        b.add("urn:other").unwrap();
        b.add("urn:acme").unwrap();

        let in_a = ExpandedNodeId::from(NodeId::numeric(1, 42));
        let in_b = ExpandedNodeId::from(NodeId::numeric(2, 42));
        assert_eq!(in_a.canonical(&a).unwrap(), in_b.canonical(&b).unwrap());
        assert_eq!(
            in_a.canonical(&a).unwrap().namespace,
            NamespaceRef::Uri("urn:acme".into())
        );
    }

    #[test]
    fn to_node_id_uses_table_indices() {
        let mut table = NamespaceTable::new();
        table.add("urn:x").unwrap();
        table.add("urn:acme").unwrap();
        let id = ExpandedNodeId::with_uri("urn:acme", Identifier::Numeric(9));
        assert_eq!(id.to_node_id(&table).unwrap(), NodeId::numeric(2, 9));

        let missing = ExpandedNodeId::with_uri("urn:nope", Identifier::Numeric(9));
        assert_eq!(
            missing.to_node_id(&table).unwrap_err(),
            NamespaceError::UnknownUri("urn:nope".into())
        );
    }

    #[test]
    fn canonical_rejects_index_outside_table() {
        let table = NamespaceTable::new();
        let id = ExpandedNodeId::numeric(4, 1);
        assert_eq!(
            id.canonical(&table).unwrap_err(),
            NamespaceError::IndexOutOfBounds(4)
        );
    }
}

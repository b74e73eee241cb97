use crate::types::{ExpandedNodeId, NamespaceRef, NodeId};
use crate::NamespaceError;

/// URI of namespace index 0 in every namespace table.
pub const OPC_UA_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// An ordered list of namespace URIs. The position of a URI is its index.
///
/// Index 0 is always [`OPC_UA_NAMESPACE_URI`]. Entries are only appended,
/// so an index handed out once stays valid for the table's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self {
            uris: vec![OPC_UA_NAMESPACE_URI.to_owned()],
        }
    }

    /// Builds a table from the URIs that follow index 0.
    pub fn with_uris<I, S>(uris: I) -> Result<Self, NamespaceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for uri in uris {
            table.add(uri)?;
        }
        Ok(table)
    }

    /// Appends `uri`, or returns its existing index.
    pub fn add(&mut self, uri: impl Into<String>) -> Result<u16, NamespaceError> {
        let uri = uri.into();
        if let Some(index) = self.index_of(&uri) {
            return Ok(index);
        }
        let index = u16::try_from(self.uris.len()).map_err(|_| NamespaceError::TableFull)?;
        self.uris.push(uri);
        Ok(index)
    }

    pub fn uri_for(&self, index: u16) -> Option<&str> {
        self.uris.get(usize::from(index)).map(String::as_str)
    }

    pub fn index_of(&self, uri: &str) -> Option<u16> {
        self.uris
            .iter()
            .position(|u| u == uri)
            .and_then(|i| u16::try_from(i).ok())
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(String::as_str)
    }

    /// Qualifies `node_id` with the URI its namespace index names in this table.
    pub fn resolve(&self, node_id: &NodeId) -> Result<ExpandedNodeId, NamespaceError> {
        let uri = self
            .uri_for(node_id.namespace)
            .ok_or(NamespaceError::IndexOutOfBounds(node_id.namespace))?;
        Ok(ExpandedNodeId {
            namespace: NamespaceRef::Uri(uri.to_owned()),
            identifier: node_id.identifier.clone(),
            server_index: 0,
        })
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

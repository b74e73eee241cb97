use crate::types::{ByteString, Guid};
use crate::DecodeError;
use core::fmt;
use core::str::FromStr;

/// The local part of a node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Guid),
    Opaque(Vec<u8>),
}

impl Identifier {
    fn is_null(&self) -> bool {
        match self {
            Self::Numeric(v) => *v == 0,
            Self::String(s) => s.is_empty(),
            Self::Guid(g) => g.is_null(),
            Self::Opaque(b) => b.is_empty(),
        }
    }

    /// Parses the `i=`, `s=`, `g=` or `b=` form.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        if let Some(v) = text.strip_prefix("i=") {
            v.parse::<u32>()
                .map(Self::Numeric)
                .map_err(|e| DecodeError::malformed("NodeId", format!("'{text}': {e}")))
        } else if let Some(v) = text.strip_prefix("s=") {
            Ok(Self::String(v.to_owned()))
        } else if let Some(v) = text.strip_prefix("g=") {
            Guid::parse(v).map(Self::Guid)
        } else if let Some(v) = text.strip_prefix("b=") {
            let bytes = ByteString::from_base64(v)?;
            Ok(Self::Opaque(bytes.into_inner().unwrap_or_default()))
        } else {
            Err(DecodeError::malformed(
                "NodeId",
                format!("'{text}' has no identifier type prefix"),
            ))
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={v}"),
            Self::String(s) => write!(f, "s={s}"),
            Self::Guid(g) => write!(f, "g={g}"),
            Self::Opaque(b) => {
                let text = ByteString::from(b.as_slice()).to_base64().unwrap_or_default();
                write!(f, "b={text}")
            }
        }
    }
}

/// A node identifier whose namespace is an index into a specific
/// [`NamespaceTable`](crate::types::NamespaceTable).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    pub const NULL: Self = Self::numeric(0, 0);

    pub const fn numeric(namespace: u16, id: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(id),
        }
    }

    pub fn string(namespace: u16, id: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(id.into()),
        }
    }

    pub const fn guid(namespace: u16, id: Guid) -> Self {
        Self {
            namespace,
            identifier: Identifier::Guid(id),
        }
    }

    pub fn opaque(namespace: u16, id: impl Into<Vec<u8>>) -> Self {
        Self {
            namespace,
            identifier: Identifier::Opaque(id.into()),
        }
    }

    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier.is_null()
    }

    pub fn as_numeric(&self) -> Option<u32> {
        match self.identifier {
            Identifier::Numeric(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        write!(f, "{}", self.identifier)
    }
}

impl FromStr for NodeId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (namespace, rest) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, rest) = rest.split_once(';').ok_or_else(|| {
                    DecodeError::malformed("NodeId", format!("'{s}' is missing ';'"))
                })?;
                let ns = ns
                    .parse::<u16>()
                    .map_err(|e| DecodeError::malformed("NodeId", format!("'{s}': {e}")))?;
                (ns, rest)
            }
            None => (0, s),
        };
        Ok(Self {
            namespace,
            identifier: Identifier::parse(rest)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Identifier, NodeId};
    use crate::types::Guid;

    #[test]
    fn text_form_roundtrip() {
        for text in [
            "i=23614",
            "ns=2;i=7",
            "ns=1;s=Pump;Speed",
            "ns=3;g=72962B91-FA75-4AE6-8D28-B404DC7DAF63",
            "ns=4;b=AQID",
        ] {
            let id: NodeId = text.parse().unwrap();
            assert_eq!(id.to_string(), text);
        }
    }

    #[test]
    fn namespace_zero_is_implicit() {
        let id: NodeId = "ns=0;i=12".parse().unwrap();
        assert_eq!(id, NodeId::numeric(0, 12));
        assert_eq!(id.to_string(), "i=12");
    }

    #[test]
    fn string_identifier_keeps_semicolons() {
        let id: NodeId = "ns=1;s=a;b".parse().unwrap();
        assert_eq!(id.identifier, Identifier::String("a;b".into()));
    }

    #[test]
    fn null_detection() {
        assert!(NodeId::NULL.is_null());
        assert!(NodeId::guid(0, Guid::NULL).is_null());
        assert!(!NodeId::numeric(1, 0).is_null());
    }

    #[test]
    fn rejects_bad_text() {
        assert!("x=5".parse::<NodeId>().is_err());
        assert!("ns=70000;i=1".parse::<NodeId>().is_err());
        assert!("ns=1".parse::<NodeId>().is_err());
    }
}

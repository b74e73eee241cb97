pub mod builtin;
pub mod byte_string;
pub mod date_time;
pub mod expanded_node_id;
pub mod guid;
pub mod identity;
pub mod namespace;
pub mod node_id;
pub mod status_code;
pub mod string;
pub mod text;
pub mod value;

pub use builtin::BuiltinType;
pub use byte_string::ByteString;
pub use date_time::DateTime;
pub use expanded_node_id::{ExpandedNodeId, NamespaceRef};
pub use guid::Guid;
pub use identity::{TypeIdentity, WireFormat};
pub use namespace::{NamespaceTable, OPC_UA_NAMESPACE_URI};
pub use node_id::{Identifier, NodeId};
pub use status_code::StatusCode;
pub use string::{UaString, XmlElement};
pub use text::{LocalizedText, QualifiedName};
pub use value::{Field, StructValue, StructValueBuilder, Value};

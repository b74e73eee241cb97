//! OPC UA XML encoding.
//!
//! Structures are elements named by field (or by type name when unnamed),
//! null values carry `xsi:nil="true"`, and extension objects are
//! `<TypeId><Identifier/></TypeId><Body><TypeName>...</TypeName></Body>`.

mod decoder;
mod encoder;
pub mod tree;

pub use decoder::XmlDecoder;
pub use encoder::XmlEncoder;
pub use tree::XmlNode;

pub(crate) const TYPE_ID: &str = "TypeId";
pub(crate) const BODY: &str = "Body";
pub(crate) const IDENTIFIER: &str = "Identifier";
pub(crate) const EXTENSION_OBJECT: &str = "ExtensionObject";
pub(crate) const UNNAMED_ARRAY: &str = "ListOfValues";

pub(crate) const INFINITY: &str = "INF";
pub(crate) const NEG_INFINITY: &str = "-INF";
pub(crate) const NAN: &str = "NaN";

/// Element nesting allowed in the raw tree for a given structural depth;
/// an extension object occupies three elements, a composite built-in two.
pub(crate) fn tree_depth_limit(max_depth: usize) -> usize {
    max_depth.saturating_mul(3).saturating_add(4)
}

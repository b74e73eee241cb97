//! OPC UA JSON encoding (reversible form).
//!
//! Int64 and UInt64 travel as quoted decimal strings; Float and Double
//! specials as `"Infinity"`, `"-Infinity"` and `"NaN"`. Extension objects
//! are `{"TypeId": "<json encoding id>", "Body": {...}}`.

mod decoder;
mod encoder;

pub use decoder::JsonDecoder;
pub use encoder::JsonEncoder;

pub(crate) const TYPE_ID: &str = "TypeId";
pub(crate) const BODY: &str = "Body";
pub(crate) const ENCODING: &str = "Encoding";

pub(crate) const INFINITY: &str = "Infinity";
pub(crate) const NEG_INFINITY: &str = "-Infinity";
pub(crate) const NAN: &str = "NaN";

//! Structure definitions and their compiled field layouts.

pub mod definition;
pub mod layout;

pub use definition::{
    StructureDefinition, StructureField, StructureType, VALUE_RANK_ONE_DIMENSION,
    VALUE_RANK_SCALAR,
};
pub use layout::{FieldKind, FieldLayout, StructureLayout, MAX_OPTIONAL_FIELDS};

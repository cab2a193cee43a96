//! Filter schemas
//!
//! A filter schema declares which fields of an entity can be filtered, their
//! value type and nullability. The registry holds one static schema per
//! entity; per-query extensions (e.g. callout answers) are built by
//! composing new schemas, never by mutating the registry.

pub mod registry;
pub mod definition;

pub use registry::FilterEntity;
pub use definition::{FilterField, FilterSchema, FilterType};

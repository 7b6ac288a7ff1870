//! Table and column metadata.
//!
//! Descriptors are supplied data, not computed here: a live introspector or
//! a static declaration builds them once, seals them, and publishes the
//! sealed catalog for the process lifetime.

mod catalog;
mod column;
mod table;

// re-exports
pub use catalog::{CatalogBuilder, SchemaCatalog};
pub use column::{Absence, ColumnDescriptor, DeleteRule, ForeignKey, NumericBounds};
pub use table::{IndexDescriptor, SchemaError, TableBuilder, TableDescriptor};

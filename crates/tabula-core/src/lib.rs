//! Core runtime for Tabula: values, the filter algebra, schema descriptors,
//! the execution engine, and the transaction/lock utilities around it.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod engine;
pub mod error;
pub mod expr;
pub mod filter;
pub mod format;
pub mod id;
pub mod idbatch;
pub mod lock;
pub mod query;
pub mod resource;
pub mod schema;
pub mod txn;
pub mod validate;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No engines, formatters, resources or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        expr::{ColumnPath, Constant, Expr},
        filter::{CompareOp, DateSpan, Degeneracy, Filter, TextOp},
        id::{Id, IdSet},
        query::{AggregateKind, SelectQuery},
        schema::{ColumnDescriptor, SchemaCatalog, TableDescriptor},
        value::{ColumnType, Value},
    };
}

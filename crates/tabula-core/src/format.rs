//! Module: format
//! Responsibility: the vendor-text boundary. The engine builds structured
//! descriptors; a formatter implementation renders them and advertises its
//! batching limits.
//! Does not own: statement execution (resource) or descriptor validation
//! (validate).

use crate::{
    filter::Filter,
    query::{AggregateQuery, SelectQuery},
    value::Value,
};
use thiserror::Error as ThisError;

///
/// Statement
///
/// Rendered vendor text. Opaque to the engine: it is dispatched verbatim
/// and quoted verbatim in failure diagnostics.
///

#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub struct Statement(String);

impl Statement {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

///
/// FormatError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FormatError {
    #[error("the formatter does not support {0}")]
    Unsupported(String),

    #[error("render failed: {0}")]
    Render(String),
}

///
/// BatchLimits
///
/// Formatter-advertised bounds the engine packs multi-row INSERTs against.
/// `max_insert_rows == Some(1)` means multi-row INSERT is not supported;
/// `None` means unbounded.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchLimits {
    pub max_insert_rows: Option<usize>,
    pub max_statement_len: Option<usize>,
}

///
/// SqlFormatter
///
/// Owns all logical-to-vendor rendering of types, values, identifiers and
/// clause syntax. Implementations live outside the core, one per vendor.
///

pub trait SqlFormatter {
    /// Render a full select descriptor.
    fn select(&self, query: &SelectQuery) -> Result<Statement, FormatError>;

    /// Render a single-value aggregate.
    fn aggregate(&self, query: &AggregateQuery) -> Result<Statement, FormatError>;

    /// Render a single- or multi-row INSERT.
    fn insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<Statement, FormatError>;

    /// Render an UPDATE of `assignments` over the rows matching `filter`.
    fn update(
        &self,
        table: &str,
        assignments: &[(String, Value)],
        filter: &Filter,
    ) -> Result<Statement, FormatError>;

    /// Render a DELETE of the rows matching `filter`.
    fn delete(&self, table: &str, filter: &Filter) -> Result<Statement, FormatError>;

    /// Batching bounds for multi-row INSERT packing.
    fn limits(&self) -> BatchLimits;

    /// Rendered length of an INSERT for `table`/`columns` carrying no rows.
    fn insert_base_len(&self, table: &str, columns: &[String]) -> usize;

    /// Rendered length one row adds to a multi-row INSERT, separator
    /// included.
    fn insert_row_len(&self, columns: &[String], row: &[Value]) -> usize;
}

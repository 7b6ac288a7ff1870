//! Module: resource
//! Responsibility: the storage-side execution boundary — exactly four
//! statement shapes plus transaction primitives.
//! Does not own: rendering (format) or failure diagnostics (engine).

use crate::{format::Statement, value::Value};
use std::time::Duration;
use thiserror::Error as ThisError;

///
/// StorageError
///
/// Raw execution failure as the resource saw it. The engine attaches
/// statement text and resource identity before re-raising.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StorageError {
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("row contention: {0}")]
    Contention(String),

    #[error("connection failure: {0}")]
    Connection(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("a transaction is already open")]
    TransactionOpen,

    #[error("no transaction is open")]
    NoTransaction,
}

///
/// Row / RowSet
///
/// Materialized tabular result: shared column header, value rows.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at (row, column name), if both exist.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }

    /// First value of the first row — the scalar shape of a row set.
    #[must_use]
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first()?.first()
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

///
/// RowCursor
///
/// Forward-only, single-pass, non-restartable row sequence. The borrow on
/// the resource keeps it exclusively bound while open; dropping the cursor
/// releases the resource.
///

pub trait RowCursor {
    fn columns(&self) -> &[String];

    /// The next row, or `None` when the sequence is exhausted.
    fn next_row(&mut self) -> Result<Option<Vec<Value>>, StorageError>;
}

///
/// StorageResource
///
/// One logical database connection. Statements execute strictly in call
/// order, one in flight at a time; every call blocks.
///

pub trait StorageResource {
    /// Stable identity of the underlying database, used for lock keying
    /// and failure diagnostics.
    fn identity(&self) -> &str;

    /// Execute and return the single value of a one-cell result.
    fn execute_scalar(&mut self, statement: &Statement) -> Result<Value, StorageError>;

    /// Execute a non-query statement; returns the affected row count.
    fn execute(&mut self, statement: &Statement) -> Result<u64, StorageError>;

    /// Execute and materialize the full result.
    fn execute_rows(&mut self, statement: &Statement) -> Result<RowSet, StorageError>;

    /// Execute and stream the result through a cursor.
    fn execute_cursor(
        &mut self,
        statement: &Statement,
    ) -> Result<Box<dyn RowCursor + '_>, StorageError>;

    fn begin(&mut self) -> Result<(), StorageError>;
    fn commit(&mut self) -> Result<(), StorageError>;
    fn rollback(&mut self) -> Result<(), StorageError>;
    fn in_transaction(&self) -> bool;

    /// Bound the execution time of each subsequent statement.
    fn set_command_timeout(&mut self, timeout: Option<Duration>);
}

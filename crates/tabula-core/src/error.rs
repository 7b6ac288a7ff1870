//! Error taxonomy.
//!
//! Lower layers raise their own narrow error enums; the engine is the
//! boundary that attaches diagnostic context (statement text, resource
//! identity) to storage failures before re-raising. Callers always receive
//! distinguishable categories: usage errors, not-found, storage failures
//! and transaction-state errors never collapse into one another.

use crate::{
    filter::FilterError, format::FormatError, id::Id, resource::StorageError,
    schema::SchemaError, validate::ValidateError,
};
use thiserror::Error as ThisError;

///
/// TransactionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TransactionError {
    #[error("a transaction is already open on `{resource}`")]
    AlreadyOpen { resource: String },

    #[error("no transaction is open on `{resource}`")]
    NotOpen { resource: String },
}

///
/// StorageFailure
///
/// A resource-level failure plus the diagnostics the engine attaches at the
/// dispatch boundary.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("storage failure on `{resource}`: {source}")]
pub struct StorageFailure {
    pub resource: String,
    /// The rendered statement that failed, when one was in flight.
    pub statement: Option<String>,
    #[source]
    pub source: StorageError,
}

///
/// Error
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum Error {
    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Storage(#[from] StorageFailure),

    /// A non-sentinel id referred to no row. Distinct from id `0`, which is
    /// "no record" and not an error.
    #[error("record {id} not found in `{table}`")]
    RecordNotFound { table: String, id: Id },

    /// A required id argument was the sentinel `0`.
    #[error("operation on `{table}` requires a record id")]
    NoIdArgument { table: String },

    /// The operation needs a primary key the table does not have the shape
    /// for, or a source row is missing key/non-key columns.
    #[error("primary-key shape error on `{table}`: {reason}")]
    PrimaryKeyShape { table: String, reason: String },
}

impl Error {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }

    /// Whether a retry-eligible entry point may retry this failure.
    /// Only storage execution failures qualify; usage errors never do.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

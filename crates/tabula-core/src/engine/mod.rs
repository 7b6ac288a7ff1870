//! The query & mutation execution engine.
//!
//! One engine instance is bound to one storage resource and is the single
//! choke point for every read and write on it: validate names and access,
//! build a descriptor, render through the formatter, dispatch to the
//! resource, and attach diagnostics to whatever comes back broken.

mod aggregate;
mod blob;
mod dedup;
mod insert;
mod read;
mod tree;
mod update;


use crate::{
    error::{Error, Result, StorageFailure, TransactionError},
    format::{SqlFormatter, Statement},
    lock::{LockRegistry, TableLockGuard},
    resource::{RowSet, StorageError, StorageResource},
    schema::{ColumnDescriptor, SchemaCatalog, TableDescriptor},
    validate::{self, ValidateError},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

// re-exports
pub use aggregate::Extreme;
pub use tree::IdExpansion;
pub use update::UpdateOutcome;

///
/// CONSTANTS
///

/// Attempts made by the single-row value-set entry point before a write
/// failure is re-raised. No other entry point retries.
pub const VALUE_SET_RETRY_ATTEMPTS: u32 = 5;

/// Ids per existence-probe SELECT during bulk update.
pub const EXISTENCE_PROBE_GROUP: usize = 500;

/// Key tuples per lookup probe during batched find-or-add.
pub const FIND_OR_ADD_PROBE_GROUP: usize = 100;

///
/// EngineOptions
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngineOptions {
    /// Per-statement execution bound handed to the resource.
    pub command_timeout: Option<Duration>,
    /// Truncate text values to the column's max length before writes.
    pub truncate_strings: bool,
    /// Reject every write entry point.
    pub read_only: bool,
    /// Pause between value-set retry attempts.
    pub retry_delay: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            command_timeout: None,
            truncate_strings: false,
            read_only: false,
            retry_delay: Duration::from_millis(100),
        }
    }
}

///
/// Engine
///

pub struct Engine<R: StorageResource, F: SqlFormatter> {
    resource: R,
    formatter: F,
    catalog: Arc<SchemaCatalog>,
    locks: Arc<LockRegistry>,
    options: EngineOptions,
}

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    // ======================================================================
    // Construction & configuration
    // ======================================================================

    pub fn new(
        mut resource: R,
        formatter: F,
        catalog: Arc<SchemaCatalog>,
        locks: Arc<LockRegistry>,
        options: EngineOptions,
    ) -> Self {
        resource.set_command_timeout(options.command_timeout);
        Self {
            resource,
            formatter,
            catalog,
            locks,
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn resource_identity(&self) -> &str {
        self.resource.identity()
    }

    // ======================================================================
    // Transaction control
    // ======================================================================

    /// Open the resource's transaction. Exactly one may be open; a second
    /// `begin` fails fast.
    pub fn begin(&mut self) -> Result<()> {
        if self.resource.in_transaction() {
            return Err(TransactionError::AlreadyOpen {
                resource: self.resource.identity().to_string(),
            }
            .into());
        }
        let outcome = self.resource.begin();
        outcome.map_err(|source| self.storage_failure(None, source))
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.resource.in_transaction() {
            return Err(TransactionError::NotOpen {
                resource: self.resource.identity().to_string(),
            }
            .into());
        }
        let outcome = self.resource.commit();
        outcome.map_err(|source| self.storage_failure(None, source))
    }

    /// Roll the open transaction back, if any.
    ///
    /// Idempotent, and never raises: a rollback failure must not mask the
    /// error that triggered the rollback, so it is logged and swallowed.
    pub fn rollback(&mut self) {
        if !self.resource.in_transaction() {
            return;
        }
        if let Err(source) = self.resource.rollback() {
            tracing::warn!(
                resource = self.resource.identity(),
                error = %source,
                "rollback failed"
            );
        }
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.resource.in_transaction()
    }

    /// Run `work` inside this resource's transaction. When the caller
    /// already holds one, it is reused and left open; otherwise one is
    /// opened for the call and committed, or rolled back on error.
    pub(crate) fn with_transaction<T>(
        &mut self,
        work: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let own = !self.resource.in_transaction();
        if own {
            self.begin()?;
        }

        match work(self) {
            Ok(value) => {
                if own {
                    self.commit()?;
                }
                Ok(value)
            }
            Err(err) => {
                if own {
                    self.rollback();
                }
                Err(err)
            }
        }
    }

    // ======================================================================
    // Table-level mutual exclusion
    // ======================================================================

    /// Take the process-wide lock for `table`, serializing dedup-sensitive
    /// work against other engine callers on this database. Re-entrant per
    /// thread; released on guard drop. SQL transactions are unaffected.
    pub fn begin_table_update(&self, table: &str) -> Result<TableLockGuard> {
        validate::require_table(&self.catalog, table)?;
        Ok(self.locks.lock(self.resource.identity(), table))
    }

    // ======================================================================
    // Dispatch helpers
    // ======================================================================

    pub(crate) fn storage_failure(
        &self,
        statement: Option<&Statement>,
        source: StorageError,
    ) -> Error {
        Error::Storage(StorageFailure {
            resource: self.resource.identity().to_string(),
            statement: statement.map(|s| s.text().to_string()),
            source,
        })
    }

    pub(crate) fn run_rows(&mut self, statement: &Statement) -> Result<RowSet> {
        tracing::debug!(resource = self.resource.identity(), statement = %statement, "rows");
        let outcome = self.resource.execute_rows(statement);
        outcome.map_err(|source| self.storage_failure(Some(statement), source))
    }

    pub(crate) fn run_scalar(&mut self, statement: &Statement) -> Result<Value> {
        tracing::debug!(resource = self.resource.identity(), statement = %statement, "scalar");
        let outcome = self.resource.execute_scalar(statement);
        outcome.map_err(|source| self.storage_failure(Some(statement), source))
    }

    pub(crate) fn run_nonquery(&mut self, statement: &Statement) -> Result<u64> {
        tracing::debug!(resource = self.resource.identity(), statement = %statement, "exec");
        let outcome = self.resource.execute(statement);
        outcome.map_err(|source| self.storage_failure(Some(statement), source))
    }

    // ======================================================================
    // Shared validation plumbing
    // ======================================================================

    /// The single Int primary-key column, or the typed shape error.
    pub(crate) fn int_key_column<'a>(
        &self,
        table: &'a TableDescriptor,
    ) -> Result<&'a ColumnDescriptor> {
        if !table.has_int_single_key() {
            return Err(Error::PrimaryKeyShape {
                table: table.name().to_string(),
                reason: "operation requires a single Int primary key".to_string(),
            });
        }
        table
            .single_key_column()
            .ok_or_else(|| Error::PrimaryKeyShape {
                table: table.name().to_string(),
                reason: "operation requires a single Int primary key".to_string(),
            })
    }

    /// Apply optional string truncation before a write.
    pub(crate) fn prepare_value(&self, column: &ColumnDescriptor, value: Value) -> Value {
        if !self.options.truncate_strings || !column.ty().is_text() {
            return value;
        }
        let Some(max_len) = column.text_max_len() else {
            return value;
        };
        match value {
            Value::Text(text) if text.chars().count() > max_len => {
                Value::Text(text.chars().take(max_len).collect())
            }
            other => other,
        }
    }

    /// Resolve and check one row of written values, applying truncation.
    pub(crate) fn prepare_row(
        &self,
        table: &TableDescriptor,
        columns: &[&ColumnDescriptor],
        values: Vec<Value>,
    ) -> Result<Vec<Value>> {
        if values.len() != columns.len() {
            return Err(ValidateError::ColumnCountMismatch {
                table: table.name().to_string(),
                expected: columns.len(),
                got: values.len(),
            }
            .into());
        }
        let values: Vec<Value> = columns
            .iter()
            .zip(values)
            .map(|(column, value)| self.prepare_value(column, value))
            .collect();
        validate::check_row(table, columns, &values)?;
        Ok(values)
    }

    /// Entry check shared by every write: table, access, column list.
    pub(crate) fn write_entry<'a>(
        &self,
        catalog: &'a SchemaCatalog,
        table: &str,
        columns: &[String],
    ) -> Result<(&'a TableDescriptor, Vec<&'a ColumnDescriptor>)> {
        let table = validate::require_table(catalog, table)?;
        validate::check_access(validate::Access::Write, self.options.read_only, table)?;
        let columns = validate::check_write_columns(table, columns)?;
        Ok((table, columns))
    }
}

impl<R: StorageResource, F: SqlFormatter> crate::txn::Transactional for Engine<R, F> {
    fn identity(&self) -> String {
        self.resource.identity().to_string()
    }

    fn in_transaction(&self) -> bool {
        self.resource.in_transaction()
    }

    fn begin(&mut self) -> Result<()> {
        Self::begin(self)
    }

    fn commit(&mut self) -> Result<()> {
        Self::commit(self)
    }

    fn rollback(&mut self) {
        Self::rollback(self);
    }
}

//! Single-row and statement-size-bounded bulk inserts.

use crate::{
    engine::Engine,
    error::{Error, Result},
    format::SqlFormatter,
    id::Id,
    query::AggregateKind,
    resource::StorageResource,
    schema::TableDescriptor,
    value::Value,
};

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    // ======================================================================
    // Single-row inserts
    // ======================================================================

    /// Insert one row under a caller-chosen id.
    pub fn add_record_with_id(
        &mut self,
        table: &str,
        id: Id,
        columns: &[String],
        values: Vec<Value>,
    ) -> Result<()> {
        let catalog = self.catalog.clone();
        let (table, descriptors) = self.write_entry(&catalog, table, columns)?;
        let key = self.int_key_column(table)?.name().to_string();

        if id.is_sentinel() {
            return Err(Error::NoIdArgument {
                table: table.name().to_string(),
            });
        }
        reject_key_column(table, columns, &key)?;

        let values = self.prepare_row(table, &descriptors, values)?;

        let mut full_columns = Vec::with_capacity(columns.len() + 1);
        full_columns.push(key);
        full_columns.extend_from_slice(columns);

        let mut full_values = Vec::with_capacity(values.len() + 1);
        full_values.push(id.to_value());
        full_values.extend(values);

        let statement = self
            .formatter
            .insert(table.name(), &full_columns, &[full_values])?;
        self.run_nonquery(&statement)?;
        Ok(())
    }

    /// Insert one row under a fresh id and return it.
    ///
    /// The id is the table's current max plus one, read under the table
    /// lock so concurrent callers cannot collide.
    pub fn add_record(&mut self, table: &str, columns: &[String], values: Vec<Value>) -> Result<Id> {
        let catalog = self.catalog.clone();
        let table_name = {
            let (table, _) = self.write_entry(&catalog, table, columns)?;
            table.name().to_string()
        };

        let _lock = self.locks.lock(self.resource.identity(), &table_name);
        let id = self.next_free_id(&catalog, &table_name)?;
        self.add_record_with_id(&table_name, id, columns, values)?;
        Ok(id)
    }

    /// The next unused id: current max plus one.
    ///
    /// Only meaningful while the caller holds the table lock; nothing else
    /// reserves the id.
    pub(crate) fn next_free_id(
        &mut self,
        catalog: &crate::schema::SchemaCatalog,
        table: &str,
    ) -> Result<Id> {
        let descriptor = crate::validate::require_table(catalog, table)?;
        let key = self.int_key_column(descriptor)?.name().to_string();

        let max = self.aggregate(table, AggregateKind::Max, Some(&key), None)?;
        match Id::from_value(&max) {
            Some(max_id) => Ok(max_id.next()),
            None => Err(Error::PrimaryKeyShape {
                table: table.to_string(),
                reason: format!("max key value {max:?} is not an id"),
            }),
        }
    }

    // ======================================================================
    // Bulk insert
    // ======================================================================

    /// Insert many rows, preferring one multi-row INSERT per statement.
    ///
    /// Rows pack greedily against both formatter limits — max rows per
    /// statement and max statement length — starting a new statement when
    /// either would be exceeded. A formatter advertising one row per
    /// statement degrades to one INSERT per row. The whole call runs inside
    /// one transaction.
    pub fn add_records(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<Value>>,
    ) -> Result<u64> {
        let catalog = self.catalog.clone();
        let (table, descriptors) = self.write_entry(&catalog, table, columns)?;
        let table_name = table.name().to_string();

        let prepared: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| self.prepare_row(table, &descriptors, row))
            .collect::<Result<_>>()?;

        if prepared.is_empty() {
            return Ok(0);
        }

        self.with_transaction(|engine| engine.insert_full_rows(&table_name, columns, &prepared))
    }

    /// Pack and issue the INSERT statements for pre-validated rows.
    pub(crate) fn insert_full_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<u64> {
        let mut inserted = 0;
        for (start, end) in self.pack_insert_batches(table, columns, rows) {
            let statement = self.formatter.insert(table, columns, &rows[start..end])?;
            inserted += self.run_nonquery(&statement)?;
        }
        Ok(inserted)
    }

    /// Greedy packing: each batch takes rows until adding one more would
    /// cross the row cap or the statement-length cap.
    fn pack_insert_batches(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Vec<(usize, usize)> {
        let limits = self.formatter.limits();
        let max_rows = limits.max_insert_rows.unwrap_or(usize::MAX).max(1);
        let base_len = self.formatter.insert_base_len(table, columns);

        let mut batches = Vec::new();
        let mut start = 0;
        let mut length = base_len;
        let mut count = 0;

        for (index, row) in rows.iter().enumerate() {
            let row_len = self.formatter.insert_row_len(columns, row);
            let over_rows = count >= max_rows;
            let over_len = count > 0
                && limits
                    .max_statement_len
                    .is_some_and(|max| length + row_len > max);

            if over_rows || over_len {
                batches.push((start, index));
                start = index;
                length = base_len;
                count = 0;
            }

            length += row_len;
            count += 1;
        }
        batches.push((start, rows.len()));

        batches
    }
}

/// Inserts supply the key separately; a key column in the value list would
/// be written twice.
fn reject_key_column(table: &TableDescriptor, columns: &[String], key: &str) -> Result<()> {
    if columns.iter().any(|name| name == key) {
        return Err(Error::PrimaryKeyShape {
            table: table.name().to_string(),
            reason: format!("key column `{key}` must not appear in the value columns"),
        });
    }
    Ok(())
}

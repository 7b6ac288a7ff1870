//! Single-row value sets (the only retrying entry point), filter-based
//! writes, bulk update and upsert.

use crate::{
    engine::{EXISTENCE_PROBE_GROUP, Engine, VALUE_SET_RETRY_ATTEMPTS, read::key_filter},
    error::{Error, Result},
    expr::Expr,
    filter::{Degeneracy, Filter},
    format::SqlFormatter,
    id::{Id, IdSet},
    idbatch::IdBatcher,
    resource::StorageResource,
    schema::TableDescriptor,
    validate,
    value::Value,
};

///
/// UpdateOutcome
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UpdateOutcome {
    pub updated: u64,
    pub inserted: u64,
}

///
/// KeyLayout
///
/// Where the primary-key columns sit inside a bulk-write column list.
///

struct KeyLayout {
    key_positions: Vec<usize>,
    key_types: Vec<crate::value::ColumnType>,
    value_positions: Vec<usize>,
}

impl KeyLayout {
    /// Split the column list into key and non-key positions. Every key
    /// column must be present, and at least one non-key column with it.
    fn resolve(table: &TableDescriptor, columns: &[String]) -> Result<Self> {
        let mut key_positions = Vec::with_capacity(table.primary_key().len());
        let mut key_types = Vec::with_capacity(table.primary_key().len());
        for key_column in table.primary_key() {
            let Some(position) = columns.iter().position(|c| c == key_column) else {
                return Err(Error::PrimaryKeyShape {
                    table: table.name().to_string(),
                    reason: format!("source rows are missing key column `{key_column}`"),
                });
            };
            key_positions.push(position);
            key_types.push(
                table
                    .column(key_column)
                    .map_or(crate::value::ColumnType::Int, |c| c.ty()),
            );
        }

        let value_positions: Vec<usize> = (0..columns.len())
            .filter(|position| !key_positions.contains(position))
            .collect();
        if value_positions.is_empty() {
            return Err(Error::PrimaryKeyShape {
                table: table.name().to_string(),
                reason: "source rows carry no non-key columns".to_string(),
            });
        }

        Ok(Self {
            key_positions,
            key_types,
            value_positions,
        })
    }

    fn row_id(&self, table: &TableDescriptor, row: &[Value]) -> Result<Id> {
        let value = &row[self.key_positions[0]];
        let id = Id::from_value(value).ok_or_else(|| Error::PrimaryKeyShape {
            table: table.name().to_string(),
            reason: format!("key value {value:?} is not an id"),
        })?;
        if id.is_sentinel() {
            return Err(Error::NoIdArgument {
                table: table.name().to_string(),
            });
        }
        Ok(id)
    }

    /// Equality filter over every key column of one row.
    fn key_filter(&self, columns: &[String], row: &[Value]) -> Filter {
        Filter::and_all(
            self.key_positions
                .iter()
                .zip(&self.key_types)
                .map(|(&position, &ty)| {
                    Filter::compare(
                        Expr::column(&columns[position]),
                        Expr::Constant(crate::expr::Constant::new(row[position].clone(), ty)),
                        crate::filter::CompareOp::Eq,
                        ty,
                    )
                })
                .collect(),
        )
    }

    fn assignments(&self, columns: &[String], row: &[Value]) -> Vec<(String, Value)> {
        self.value_positions
            .iter()
            .map(|&position| (columns[position].clone(), row[position].clone()))
            .collect()
    }
}

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    // ======================================================================
    // Single-row value set (retrying)
    // ======================================================================

    /// Set column values on one record.
    ///
    /// The only retrying entry point: a storage failure (row contention,
    /// transient faults) is retried up to five times with a fixed short
    /// delay, then re-raised. Usage errors never retry.
    pub fn set_values(
        &mut self,
        table: &str,
        id: Id,
        assignments: &[(String, Value)],
    ) -> Result<()> {
        let catalog = self.catalog.clone();
        let column_names: Vec<String> = assignments.iter().map(|(c, _)| c.clone()).collect();
        let (table, descriptors) = self.write_entry(&catalog, table, &column_names)?;
        let key = self.int_key_column(table)?.name().to_string();
        let table_name = table.name().to_string();

        if id.is_sentinel() {
            return Err(Error::NoIdArgument { table: table_name });
        }

        let values: Vec<Value> = assignments.iter().map(|(_, v)| v.clone()).collect();
        let values = self.prepare_row(table, &descriptors, values)?;
        let prepared: Vec<(String, Value)> =
            column_names.into_iter().zip(values).collect();

        let statement = self
            .formatter
            .update(&table_name, &prepared, &key_filter(&key, id))?;

        let mut attempt = 1;
        loop {
            match self.run_nonquery(&statement) {
                Ok(0) => {
                    return Err(Error::RecordNotFound {
                        table: table_name.clone(),
                        id,
                    });
                }
                Ok(_) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < VALUE_SET_RETRY_ATTEMPTS => {
                    tracing::warn!(
                        table = %table_name,
                        %id,
                        attempt,
                        error = %err,
                        "value set failed; retrying"
                    );
                    std::thread::sleep(self.options.retry_delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    // ======================================================================
    // Filter-based writes (never retried)
    // ======================================================================

    /// Update `assignments` on every row matching `filter`.
    pub fn update_where(
        &mut self,
        table: &str,
        assignments: &[(String, Value)],
        filter: &Filter,
    ) -> Result<u64> {
        let catalog = self.catalog.clone();
        let column_names: Vec<String> = assignments.iter().map(|(c, _)| c.clone()).collect();
        let (table, descriptors) = self.write_entry(&catalog, table, &column_names)?;
        validate::check_filter(table, filter)?;

        if filter.degeneracy() == Degeneracy::AlwaysFalse {
            return Ok(0);
        }

        let values: Vec<Value> = assignments.iter().map(|(_, v)| v.clone()).collect();
        let values = self.prepare_row(table, &descriptors, values)?;
        let prepared: Vec<(String, Value)> = column_names.into_iter().zip(values).collect();

        let statement = self.formatter.update(table.name(), &prepared, filter)?;
        self.run_nonquery(&statement)
    }

    /// Delete every row matching `filter`.
    pub fn delete_records(&mut self, table: &str, filter: &Filter) -> Result<u64> {
        let catalog = self.catalog.clone();
        let table = validate::require_table(&catalog, table)?;
        validate::check_access(validate::Access::Write, self.options.read_only, table)?;
        validate::check_filter(table, filter)?;

        if filter.degeneracy() == Degeneracy::AlwaysFalse {
            return Ok(0);
        }

        let statement = self.formatter.delete(table.name(), filter)?;
        self.run_nonquery(&statement)
    }

    // ======================================================================
    // Bulk update
    // ======================================================================

    /// Update many rows, inserting the ones that do not exist yet.
    ///
    /// Source rows must carry every primary-key column plus at least one
    /// non-key column; composite keys are supported. For a single Int key,
    /// existence is probed in groups of 500 ids instead of once per row.
    pub fn update_records(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<Value>>,
    ) -> Result<UpdateOutcome> {
        let catalog = self.catalog.clone();
        let (table, descriptors) = self.write_entry(&catalog, table, columns)?;
        let layout = KeyLayout::resolve(table, columns)?;
        let table_name = table.name().to_string();

        let prepared: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| self.prepare_row(table, &descriptors, row))
            .collect::<Result<_>>()?;
        if prepared.is_empty() {
            return Ok(UpdateOutcome::default());
        }

        if table.has_int_single_key() {
            let mut ids = IdSet::new();
            for row in &prepared {
                ids.insert(layout.row_id(table, row)?);
            }
            let existing = self.probe_existing(table, &ids, EXISTENCE_PROBE_GROUP)?;
            self.apply_partitioned(&table_name, columns, &layout, prepared, |row| {
                let id = layout.row_id(table, row).unwrap_or(Id::SENTINEL);
                existing.contains(&id)
            })
        } else {
            self.apply_row_by_row(&table_name, columns, &layout, prepared)
        }
    }

    // ======================================================================
    // Upsert
    // ======================================================================

    /// Insert-or-update by primary key.
    ///
    /// The single-Int-key path loads existing ids with one IN-list SELECT
    /// and partitions the source by membership. Composite and non-Int keys
    /// fall back to one existence probe per row — a known scalability
    /// boundary, kept deliberately.
    pub fn upsert_records(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<Value>>,
    ) -> Result<UpdateOutcome> {
        let catalog = self.catalog.clone();
        let (table, descriptors) = self.write_entry(&catalog, table, columns)?;
        let layout = KeyLayout::resolve(table, columns)?;
        let table_name = table.name().to_string();

        let prepared: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| self.prepare_row(table, &descriptors, row))
            .collect::<Result<_>>()?;
        if prepared.is_empty() {
            return Ok(UpdateOutcome::default());
        }

        if table.has_int_single_key() {
            let key = self.int_key_column(table)?.name().to_string();
            let mut ids = IdSet::new();
            for row in &prepared {
                ids.insert(layout.row_id(table, row)?);
            }
            let existing =
                self.read_ids(&table_name, &Filter::ids_in(Expr::column(&key), ids))?;
            self.apply_partitioned(&table_name, columns, &layout, prepared, |row| {
                let id = layout.row_id(table, row).unwrap_or(Id::SENTINEL);
                existing.contains(&id)
            })
        } else {
            self.apply_row_by_row(&table_name, columns, &layout, prepared)
        }
    }

    // ======================================================================
    // Shared bulk plumbing
    // ======================================================================

    /// Probe which of `ids` exist, `group` ids per SELECT.
    fn probe_existing(
        &mut self,
        table: &TableDescriptor,
        ids: &IdSet,
        group: usize,
    ) -> Result<IdSet> {
        let key = self.int_key_column(table)?.name().to_string();
        let table_name = table.name().to_string();
        let batcher = IdBatcher::with_group_size(ids, group);

        let mut existing = IdSet::new();
        for filter in batcher.filters(&Expr::column(&key)) {
            existing.extend(self.read_ids(&table_name, &filter)?);
        }
        Ok(existing)
    }

    /// Split the source by `exists`, update the matches row by row, and
    /// bulk-insert the rest, all inside one transaction.
    fn apply_partitioned(
        &mut self,
        table: &str,
        columns: &[String],
        layout: &KeyLayout,
        rows: Vec<Vec<Value>>,
        exists: impl Fn(&[Value]) -> bool,
    ) -> Result<UpdateOutcome> {
        let (to_update, to_insert): (Vec<Vec<Value>>, Vec<Vec<Value>>) =
            rows.into_iter().partition(|row| exists(row));

        self.with_transaction(|engine| {
            let mut outcome = UpdateOutcome::default();

            for row in &to_update {
                let statement = engine.formatter.update(
                    table,
                    &layout.assignments(columns, row),
                    &layout.key_filter(columns, row),
                )?;
                outcome.updated += engine.run_nonquery(&statement)?;
            }

            if !to_insert.is_empty() {
                outcome.inserted = engine.insert_full_rows(table, columns, &to_insert)?;
            }

            Ok(outcome)
        })
    }

    /// One existence probe per row; composite-key path.
    fn apply_row_by_row(
        &mut self,
        table: &str,
        columns: &[String],
        layout: &KeyLayout,
        rows: Vec<Vec<Value>>,
    ) -> Result<UpdateOutcome> {
        self.with_transaction(|engine| {
            let mut outcome = UpdateOutcome::default();

            for row in &rows {
                let probe = layout.key_filter(columns, row);
                let found = engine.count(table, Some(&probe))?;
                if found > 0 {
                    let statement = engine.formatter.update(
                        table,
                        &layout.assignments(columns, row),
                        &probe,
                    )?;
                    outcome.updated += engine.run_nonquery(&statement)?;
                } else {
                    outcome.inserted +=
                        engine.insert_full_rows(table, columns, std::slice::from_ref(row))?;
                }
            }

            Ok(outcome)
        })
    }

}

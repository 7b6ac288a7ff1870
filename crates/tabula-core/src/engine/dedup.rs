//! Find-or-add: lookup by key values, insert when absent, serialized by
//! the process-wide table lock so concurrent callers cannot double-insert.

use crate::{
    engine::{Engine, FIND_OR_ADD_PROBE_GROUP},
    error::{Error, Result},
    expr::{Constant, Expr},
    filter::{CompareOp, Filter},
    format::SqlFormatter,
    id::Id,
    query::SelectQuery,
    resource::StorageResource,
    schema::ColumnDescriptor,
    value::Value,
};

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    /// Return the id of the row matching the (column, value) pairs,
    /// inserting it first when absent.
    ///
    /// Lookup and insert run under the table lock, held across both, so two
    /// concurrent callers with the same pairs get the same id and exactly
    /// one insert happens. When several rows already match, the lowest id
    /// wins.
    pub fn find_or_add(&mut self, table: &str, pairs: &[(String, Value)]) -> Result<Id> {
        let catalog = self.catalog.clone();
        let column_names: Vec<String> = pairs.iter().map(|(c, _)| c.clone()).collect();
        let (table, descriptors) = self.write_entry(&catalog, table, &column_names)?;
        let key = self.int_key_column(table)?.name().to_string();
        let table_name = table.name().to_string();

        if column_names.iter().any(|name| *name == key) {
            return Err(Error::PrimaryKeyShape {
                table: table_name,
                reason: format!("key column `{key}` cannot be a find-or-add key value"),
            });
        }

        let values: Vec<Value> = pairs.iter().map(|(_, v)| v.clone()).collect();
        let values = self.prepare_row(table, &descriptors, values)?;

        let _lock = self.locks.lock(self.resource.identity(), &table_name);

        let filter = lookup_filter(&descriptors, &values);
        let found = self.read_ids(&table_name, &filter)?;
        if let Some(id) = found.first() {
            return Ok(*id);
        }

        let id = self.next_free_id(&catalog, &table_name)?;
        self.add_record_with_id(&table_name, id, &column_names, values)?;
        Ok(id)
    }

    /// Batched find-or-add over many key tuples.
    ///
    /// Lookups are probed 100 tuples at a time; rows still missing get
    /// fresh sequential ids assigned from one read of the table's current
    /// max id — safe only because the whole batch runs under the same
    /// table lock, not because of any database sequence. Duplicate tuples
    /// within the batch share one id. The result aligns with the input.
    pub fn find_or_add_many(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<Value>>,
    ) -> Result<Vec<Id>> {
        let catalog = self.catalog.clone();
        let (table, descriptors) = self.write_entry(&catalog, table, columns)?;
        let key = self.int_key_column(table)?.name().to_string();
        let table_name = table.name().to_string();

        if columns.iter().any(|name| *name == key) {
            return Err(Error::PrimaryKeyShape {
                table: table_name,
                reason: format!("key column `{key}` cannot be a find-or-add key value"),
            });
        }

        let prepared: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| self.prepare_row(table, &descriptors, row))
            .collect::<Result<_>>()?;
        if prepared.is_empty() {
            return Ok(Vec::new());
        }

        let _lock = self.locks.lock(self.resource.identity(), &table_name);

        // First occurrence of each distinct tuple drives one probe slot.
        let mut distinct: Vec<usize> = Vec::new();
        for (index, row) in prepared.iter().enumerate() {
            if !distinct.iter().any(|&seen| prepared[seen] == *row) {
                distinct.push(index);
            }
        }

        let mut known: Vec<(Vec<Value>, Id)> = Vec::new();
        for chunk in distinct.chunks(FIND_OR_ADD_PROBE_GROUP) {
            let filter = Filter::or_all(
                chunk
                    .iter()
                    .map(|&index| lookup_filter(&descriptors, &prepared[index]))
                    .collect(),
            );

            let mut outputs = vec![Expr::column(&key)];
            outputs.extend(columns.iter().map(|name| Expr::column(name)));
            let query = SelectQuery::new(&table_name)
                .outputs(outputs)
                .filter(filter);
            let statement = self.formatter.select(&query)?;
            let found = self.run_rows(&statement)?;

            for row in found.rows() {
                let id_value = row.first().cloned().unwrap_or(Value::Null);
                let Some(id) = Id::from_value(&id_value) else {
                    return Err(Error::PrimaryKeyShape {
                        table: table_name.clone(),
                        reason: format!("key value {id_value:?} is not an id"),
                    });
                };
                let tuple: Vec<Value> = row[1..].to_vec();
                if !known.iter().any(|(t, _)| *t == tuple) {
                    known.push((tuple, id));
                }
            }
        }

        // Assign fresh sequential ids to the tuples still unresolved.
        let mut full_columns = Vec::with_capacity(columns.len() + 1);
        full_columns.push(key);
        full_columns.extend_from_slice(columns);

        let mut assigned = Vec::with_capacity(prepared.len());
        let mut to_insert: Vec<Vec<Value>> = Vec::new();
        let mut next: Option<Id> = None;

        for row in &prepared {
            if let Some((_, id)) = known.iter().find(|(tuple, _)| tuple == row) {
                assigned.push(*id);
                continue;
            }

            let id = match next {
                Some(previous) => previous.next(),
                None => self.next_free_id(&catalog, &table_name)?,
            };
            next = Some(id);

            let mut full_row = Vec::with_capacity(row.len() + 1);
            full_row.push(id.to_value());
            full_row.extend(row.iter().cloned());
            to_insert.push(full_row);

            known.push((row.clone(), id));
            assigned.push(id);
        }

        if !to_insert.is_empty() {
            self.with_transaction(|engine| {
                engine.insert_full_rows(&table_name, &full_columns, &to_insert)
            })?;
        }

        Ok(assigned)
    }
}

/// Conjunction of equality predicates over the key (column, value) pairs.
fn lookup_filter(descriptors: &[&ColumnDescriptor], values: &[Value]) -> Filter {
    Filter::and_all(
        descriptors
            .iter()
            .zip(values)
            .map(|(column, value)| {
                Filter::compare(
                    Expr::column(column.name()),
                    Expr::Constant(Constant::new(value.clone(), column.ty())),
                    CompareOp::Eq,
                    column.ty(),
                )
            })
            .collect(),
    )
}

//! Point reads, materialized reads and cursor reads.

use crate::{
    engine::Engine,
    error::{Error, Result},
    expr::{ColumnPath, Expr},
    filter::{Degeneracy, Filter},
    format::SqlFormatter,
    id::{Id, IdSet},
    query::SelectQuery,
    resource::{RowCursor, RowSet, StorageResource},
    schema::TableDescriptor,
    validate::{self, Access, ResolvedPath},
    value::Value,
};

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    // ======================================================================
    // Point reads
    // ======================================================================

    /// Read one column of one record.
    ///
    /// A dotted path resolves as a chain of single-column lookups through
    /// successive foreign-key targets, one SELECT per hop — never a join.
    pub fn get_value(&mut self, table: &str, id: Id, path: &ColumnPath) -> Result<Value> {
        let mut values = self.get_values(table, id, std::slice::from_ref(path))?;
        Ok(values.pop().unwrap_or(Value::Null))
    }

    /// Read several columns of one record, in path order.
    ///
    /// The sentinel id `0` means "no record": every requested column comes
    /// back NULL and no SQL is issued. A non-zero id with no matching row
    /// is `RecordNotFound`.
    pub fn get_values(&mut self, table: &str, id: Id, paths: &[ColumnPath]) -> Result<Vec<Value>> {
        let catalog = self.catalog.clone();
        let table = validate::require_table(&catalog, table)?;
        validate::check_access(Access::Read, false, table)?;

        let resolved: Vec<ResolvedPath<'_>> = paths
            .iter()
            .map(|path| validate::resolve_path(&catalog, table, path))
            .collect::<std::result::Result<_, _>>()?;

        if id.is_sentinel() {
            return Ok(vec![Value::Null; paths.len()]);
        }

        let key = self.int_key_column(table)?.name().to_string();
        let mut out = vec![Value::Null; paths.len()];

        // Simple columns resolve in one combined SELECT.
        let simple: Vec<(usize, &str)> = resolved
            .iter()
            .enumerate()
            .filter(|(_, r)| r.hops.is_empty())
            .map(|(i, r)| (i, r.leaf_column.name()))
            .collect();

        if !simple.is_empty() {
            let query = SelectQuery::new(table.name())
                .outputs(simple.iter().map(|(_, name)| Expr::column(name)))
                .filter(key_filter(&key, id));
            let statement = self.formatter.select(&query)?;
            let rows = self.run_rows(&statement)?;
            let row = rows.rows().first().ok_or_else(|| Error::RecordNotFound {
                table: table.name().to_string(),
                id,
            })?;
            for (slot, (out_index, _)) in simple.iter().enumerate() {
                out[*out_index] = row.get(slot).cloned().unwrap_or(Value::Null);
            }
        }

        // Dotted paths walk their hop chains.
        for (index, path) in resolved.iter().enumerate() {
            if !path.hops.is_empty() {
                out[index] = self.read_path_chain(id, path)?;
            }
        }

        Ok(out)
    }

    /// Walk one resolved dotted path: each hop reads the foreign-key value
    /// and carries it into the target table. A NULL or sentinel reference
    /// anywhere along the chain ends it with NULL.
    fn read_path_chain(&mut self, id: Id, path: &ResolvedPath<'_>) -> Result<Value> {
        let mut current = id;

        for hop in &path.hops {
            let value = self.lookup_column(hop.table, current, hop.column.name())?;
            let Some(next) = Id::from_value(&value) else {
                return Err(Error::PrimaryKeyShape {
                    table: hop.table.name().to_string(),
                    reason: format!("foreign key `{}` is not an id", hop.column.name()),
                });
            };
            if next.is_sentinel() {
                return Ok(Value::Null);
            }
            self.int_key_column(hop.target)?;
            current = next;
        }

        self.lookup_column(path.leaf_table, current, path.leaf_column.name())
    }

    fn lookup_column(
        &mut self,
        table: &TableDescriptor,
        id: Id,
        column: &str,
    ) -> Result<Value> {
        let key = self.int_key_column(table)?.name().to_string();
        let query = SelectQuery::new(table.name())
            .output(Expr::column(column))
            .filter(key_filter(&key, id));
        let statement = self.formatter.select(&query)?;
        let rows = self.run_rows(&statement)?;
        rows.scalar()
            .cloned()
            .ok_or_else(|| Error::RecordNotFound {
                table: table.name().to_string(),
                id,
            })
    }

    // ======================================================================
    // Set reads
    // ======================================================================

    /// Materialize a full query result.
    ///
    /// A statically-false filter short-circuits to an empty result without
    /// issuing SQL; a statically-true filter is dropped from the statement.
    pub fn read(&mut self, query: &SelectQuery) -> Result<RowSet> {
        let catalog = self.catalog.clone();
        validate::check_query(&catalog, query)?;

        let effective = match effective_query(query) {
            Some(effective) => effective,
            None => return Ok(empty_result(query)),
        };

        let statement = self.formatter.select(&effective)?;
        self.run_rows(&statement)
    }

    /// Stream a query result through a forward-only cursor.
    ///
    /// The cursor borrows this engine exclusively while open; no other
    /// operation can be issued on the resource until it is dropped.
    pub fn cursor(&mut self, query: &SelectQuery) -> Result<Box<dyn RowCursor + '_>> {
        let catalog = self.catalog.clone();
        validate::check_query(&catalog, query)?;

        // Statically false: nothing can match, so never open a statement.
        let Some(effective) = effective_query(query) else {
            return Ok(Box::new(EmptyCursor {
                columns: empty_result(query).columns().to_vec(),
            }));
        };

        let statement = self.formatter.select(&effective)?;
        tracing::debug!(resource = self.resource.identity(), statement = %statement, "cursor");

        let resource_name = self.resource.identity().to_string();
        let statement_text = statement.text().to_string();
        self.resource
            .execute_cursor(&statement)
            .map_err(move |source| {
                Error::Storage(crate::error::StorageFailure {
                    resource: resource_name,
                    statement: Some(statement_text),
                    source,
                })
            })
    }

    /// Load the ids of every row matching `filter`.
    pub fn read_ids(&mut self, table: &str, filter: &Filter) -> Result<IdSet> {
        let catalog = self.catalog.clone();
        let table = validate::require_table(&catalog, table)?;
        let key = self.int_key_column(table)?.name().to_string();
        validate::check_filter(table, filter)?;

        if filter.degeneracy() == Degeneracy::AlwaysFalse {
            return Ok(IdSet::new());
        }

        let mut query = SelectQuery::new(table.name()).output(Expr::column(&key));
        if filter.degeneracy() != Degeneracy::AlwaysTrue {
            query = query.filter(filter.clone());
        }

        let statement = self.formatter.select(&query)?;
        let rows = self.run_rows(&statement)?;

        let mut ids = IdSet::new();
        for row in rows.rows() {
            let value = row.first().cloned().unwrap_or(Value::Null);
            let id = Id::from_value(&value).ok_or_else(|| Error::PrimaryKeyShape {
                table: table.name().to_string(),
                reason: format!("key value {value:?} is not an id"),
            })?;
            ids.insert(id);
        }
        Ok(ids)
    }
}

/// Equality filter on the Int primary key.
pub(crate) fn key_filter(key: &str, id: Id) -> Filter {
    Filter::compare(
        Expr::column(key),
        Expr::constant(id.get(), crate::value::ColumnType::Int),
        crate::filter::CompareOp::Eq,
        crate::value::ColumnType::Int,
    )
}

/// Apply filter degeneracy to a query: `None` when no row can match.
fn effective_query(query: &SelectQuery) -> Option<SelectQuery> {
    match query.filter.as_ref().map(Filter::degeneracy) {
        Some(Degeneracy::AlwaysFalse) => None,
        Some(Degeneracy::AlwaysTrue) => {
            let mut effective = query.clone();
            effective.filter = None;
            Some(effective)
        }
        _ => Some(query.clone()),
    }
}

///
/// EmptyCursor
///
/// The cursor of a statically-false query: exhausted from the start.
///

struct EmptyCursor {
    columns: Vec<String>,
}

impl RowCursor for EmptyCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> std::result::Result<Option<Vec<Value>>, crate::resource::StorageError> {
        Ok(None)
    }
}

/// The empty result of a statically-false query, headers preserved.
fn empty_result(query: &SelectQuery) -> RowSet {
    let columns = query
        .outputs
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    RowSet::new(columns, Vec::new())
}

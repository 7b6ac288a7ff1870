//! Aggregate and extreme-row queries.

use crate::{
    engine::Engine,
    error::Result,
    expr::Expr,
    filter::{CompareOp, Degeneracy, Filter},
    format::SqlFormatter,
    query::{AggregateKind, AggregateQuery, SelectQuery},
    resource::StorageResource,
    validate::{self, Access, ValidateError},
    value::Value,
};

///
/// Extreme
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Extreme {
    Min,
    Max,
}

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    /// Single-value aggregate over the rows matching `filter`.
    ///
    /// When the aggregated column is nullable and the filter carries no
    /// equivalent not-null predicate on it, one is injected: NULLs must not
    /// silently distort MIN/MAX/SUM.
    pub fn aggregate(
        &mut self,
        table: &str,
        kind: AggregateKind,
        column: Option<&str>,
        filter: Option<&Filter>,
    ) -> Result<Value> {
        let catalog = self.catalog.clone();
        let table = validate::require_table(&catalog, table)?;
        validate::check_access(Access::Read, false, table)?;
        if let Some(filter) = filter {
            validate::check_filter(table, filter)?;
        }

        let mut effective = filter.cloned();
        let column = match (kind, column) {
            (AggregateKind::Count, None) => None,
            (_, Some(name)) => {
                let descriptor = validate::require_column(table, name)?;
                if kind == AggregateKind::Sum && !descriptor.ty().is_numeric() {
                    return Err(ValidateError::NotNumeric {
                        table: table.name().to_string(),
                        column: name.to_string(),
                    }
                    .into());
                }
                if kind != AggregateKind::Count && descriptor.is_nullable() {
                    let not_null = not_null_filter(name, descriptor.ty());
                    if !has_not_null_predicate(effective.as_ref(), name) {
                        effective = Some(match effective {
                            Some(filter) => filter.and(not_null),
                            None => not_null,
                        });
                    }
                }
                Some(name.to_string())
            }
            (kind, None) => {
                return Err(ValidateError::UnknownColumn {
                    table: table.name().to_string(),
                    column: format!("<{kind:?} aggregate requires a column>"),
                }
                .into());
            }
        };

        // A filter no row can satisfy never reaches the resource.
        if effective
            .as_ref()
            .is_some_and(|f| f.degeneracy() == Degeneracy::AlwaysFalse)
        {
            return Ok(match kind {
                AggregateKind::Count => Value::Int(0),
                _ => Value::Null,
            });
        }
        if effective
            .as_ref()
            .is_some_and(|f| f.degeneracy() == Degeneracy::AlwaysTrue)
        {
            effective = None;
        }

        let query = AggregateQuery {
            table: table.name().to_string(),
            kind,
            column,
            filter: effective,
        };
        let statement = self.formatter.aggregate(&query)?;
        self.run_scalar(&statement)
    }

    /// Count the rows matching `filter`.
    pub fn count(&mut self, table: &str, filter: Option<&Filter>) -> Result<u64> {
        let value = self.aggregate(table, AggregateKind::Count, None, filter)?;
        match value {
            Value::Int(n) if n >= 0 => Ok(u64::try_from(n).unwrap_or(0)),
            _ => Ok(0),
        }
    }

    /// The row holding the extreme value of `by`, as an output tuple.
    ///
    /// Orders by the column (descending for `Max`), caps at one row, and
    /// returns an all-NULL tuple — deliberately distinct from "zero rows" —
    /// when nothing qualifies. When several rows share the extreme value,
    /// which one is returned is implementation-defined.
    pub fn row_at_extreme(
        &mut self,
        table: &str,
        by: &str,
        extreme: Extreme,
        outputs: &[String],
        filter: Option<&Filter>,
    ) -> Result<Vec<Value>> {
        let catalog = self.catalog.clone();
        let table_desc = validate::require_table(&catalog, table)?;
        validate::require_column(table_desc, by)?;
        for output in outputs {
            validate::require_column(table_desc, output)?;
        }
        if let Some(filter) = filter {
            validate::check_filter(table_desc, filter)?;
        }

        let mut query = SelectQuery::new(table)
            .outputs(outputs.iter().map(|name| Expr::column(name)))
            .order_by(Expr::column(by), extreme == Extreme::Max)
            .cap(1);
        if let Some(filter) = filter {
            query = query.filter(filter.clone());
        }

        let rows = self.read(&query)?;
        Ok(rows
            .rows()
            .first()
            .cloned()
            .unwrap_or_else(|| vec![Value::Null; outputs.len()]))
    }
}

/// `column <> NULL`, which formatters render as `column IS NOT NULL`.
fn not_null_filter(column: &str, ty: crate::value::ColumnType) -> Filter {
    Filter::compare(
        Expr::column(column),
        Expr::Constant(crate::expr::Constant::null(ty)),
        CompareOp::Ne,
        ty,
    )
}

/// Whether the filter already guarantees `column` non-null in every
/// conjunctive position. Only predicates reachable through `And` nodes
/// count: a not-null arm under `Or` guarantees nothing.
fn has_not_null_predicate(filter: Option<&Filter>, column: &str) -> bool {
    let Some(filter) = filter else {
        return false;
    };

    match filter {
        Filter::Compare(f) => {
            f.op == CompareOp::Ne
                && f.left.as_column().is_some_and(|p| p.to_string() == column)
                && f.right.as_constant().is_some_and(|c| c.value.is_null())
        }
        Filter::Not(inner) => match inner.as_ref() {
            Filter::Compare(f) => {
                f.op == CompareOp::Eq
                    && f.left.as_column().is_some_and(|p| p.to_string() == column)
                    && f.right.as_constant().is_some_and(|c| c.value.is_null())
            }
            _ => false,
        },
        Filter::And(children) => children
            .iter()
            .any(|child| has_not_null_predicate(Some(child), column)),
        _ => false,
    }
}

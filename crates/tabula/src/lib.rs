//! Tabula: a typed, database-agnostic relational data-access engine.
//!
//! This crate is the caller-facing surface over `tabula-core`: the prelude,
//! the re-exported core modules, and the thin argument adapters. Every
//! operation has one canonical form in the core (column list + value list);
//! the adapters here only reshape caller arguments into it.

pub use tabula_core::{
    engine, error, expr, filter, format, id, idbatch, lock, query, resource, schema, txn,
    validate, value,
};

pub use tabula_core::error::{Error, Result};

pub mod prelude {
    pub use tabula_core::prelude::*;

    pub use crate::filters;
    pub use tabula_core::{
        engine::{Engine, EngineOptions},
        error::{Error, Result},
        lock::LockRegistry,
        txn::TransactionScope,
    };
}

///
/// Filter builders
///
/// Shorthand constructors for the common filter shapes. Everything here is
/// a direct call into the algebra's canonical constructors.
///

pub mod filters {
    use tabula_core::{
        expr::{Constant, Expr},
        filter::{CompareOp, DateSpan, Filter, TextOp},
        id::IdSet,
        value::{ColumnType, Value},
    };

    /// `column = value`
    #[must_use]
    pub fn eq(column: &str, value: impl Into<Value>, ty: ColumnType) -> Filter {
        compare(column, value, CompareOp::Eq, ty)
    }

    /// `column <> value`
    #[must_use]
    pub fn ne(column: &str, value: impl Into<Value>, ty: ColumnType) -> Filter {
        compare(column, value, CompareOp::Ne, ty)
    }

    /// `column > value`
    #[must_use]
    pub fn gt(column: &str, value: impl Into<Value>, ty: ColumnType) -> Filter {
        compare(column, value, CompareOp::Gt, ty)
    }

    /// `column < value`
    #[must_use]
    pub fn lt(column: &str, value: impl Into<Value>, ty: ColumnType) -> Filter {
        compare(column, value, CompareOp::Lt, ty)
    }

    /// `column IS NOT NULL`
    #[must_use]
    pub fn not_null(column: &str, ty: ColumnType) -> Filter {
        Filter::compare(
            Expr::column(column),
            Expr::Constant(Constant::null(ty)),
            CompareOp::Ne,
            ty,
        )
    }

    /// `min <= column <= max`, either side optional.
    #[must_use]
    pub fn between(
        column: &str,
        min: Option<Value>,
        max: Option<Value>,
        ty: ColumnType,
    ) -> Filter {
        Filter::numeric_range(Expr::column(column), min, max, ty)
    }

    /// `column IN (ids…)`
    #[must_use]
    pub fn ids_in(column: &str, ids: IdSet) -> Filter {
        Filter::ids_in(Expr::column(column), ids)
    }

    /// Inclusive date range on a date column.
    #[must_use]
    pub fn date_between(column: &str, span: DateSpan) -> Filter {
        Filter::date_range(Expr::column(column), span)
    }

    /// Case-insensitive or exact string equality.
    #[must_use]
    pub fn text_eq(column: &str, value: &str, ignore_case: bool) -> Filter {
        Filter::text(Expr::column(column), TextOp::Equals, value, ignore_case)
    }

    /// String prefix match.
    #[must_use]
    pub fn starts_with(column: &str, prefix: &str, ignore_case: bool) -> Filter {
        Filter::text(Expr::column(column), TextOp::StartsWith, prefix, ignore_case)
    }

    /// Substring match.
    #[must_use]
    pub fn contains(column: &str, needle: &str, ignore_case: bool) -> Filter {
        Filter::text(Expr::column(column), TextOp::Contains, needle, ignore_case)
    }

    fn compare(column: &str, value: impl Into<Value>, op: CompareOp, ty: ColumnType) -> Filter {
        Filter::compare(
            Expr::column(column),
            Expr::Constant(Constant::new(value.into(), ty)),
            op,
            ty,
        )
    }
}

///
/// Argument adapters
///
/// The canonical engine operations take `&[String]` column lists and
/// `Vec<Vec<Value>>` row lists; these helpers build them from the shapes
/// callers actually hold.
///

pub mod args {
    use tabula_core::value::Value;

    /// Owned column-name list from string literals.
    #[must_use]
    pub fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    /// Owned (column, value) pairs from borrowed names.
    #[must_use]
    pub fn pairs(entries: &[(&str, Value)]) -> Vec<(String, Value)> {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    /// Split (column, value) pairs into the canonical column/value lists.
    #[must_use]
    pub fn split_pairs(entries: &[(&str, Value)]) -> (Vec<String>, Vec<Value>) {
        (
            entries.iter().map(|(name, _)| (*name).to_string()).collect(),
            entries.iter().map(|(_, value)| value.clone()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::filters;
    use tabula_core::{
        filter::{Degeneracy, Filter},
        value::ColumnType,
    };

    #[test]
    fn builders_feed_the_algebra() {
        let filter = filters::eq("name", "alice", ColumnType::Text)
            .and(filters::between("age", Some(18i64.into()), None, ColumnType::Int));

        assert_eq!(filter.degeneracy(), Degeneracy::Normal);
        assert_eq!(filter.required_columns().len(), 2);
    }

    #[test]
    fn degenerate_builder_output_folds_in_combinators() {
        let none = filters::between("age", Some(9i64.into()), Some(1i64.into()), ColumnType::Int);
        let keep = filters::eq("name", "alice", ColumnType::Text);

        assert_eq!(none.clone().and(keep.clone()), Filter::Constant(false));
        assert_eq!(none.or(keep.clone()), keep);
    }

    #[test]
    fn split_pairs_preserves_order() {
        let (columns, values) = crate::args::split_pairs(&[
            ("a", 1i64.into()),
            ("b", 2i64.into()),
        ]);
        assert_eq!(columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(values.len(), 2);
    }
}

//! Structured query descriptors handed to the formatter.

use crate::{expr::Expr, filter::Filter};
use serde::{Deserialize, Serialize};

///
/// OrderBy
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct OrderBy {
    pub expr: Expr,
    pub descending: bool,
}

///
/// SelectQuery
///
/// Immutable per-call read descriptor: table, output expressions, and the
/// optional filter / order / row-cap / distinct refinements.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SelectQuery {
    pub table: String,
    pub outputs: Vec<Expr>,
    pub filter: Option<Filter>,
    pub order: Vec<OrderBy>,
    pub row_cap: Option<u64>,
    pub distinct: bool,
}

impl SelectQuery {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            outputs: Vec::new(),
            filter: None,
            order: Vec::new(),
            row_cap: None,
            distinct: false,
        }
    }

    #[must_use]
    pub fn output(mut self, expr: Expr) -> Self {
        self.outputs.push(expr);
        self
    }

    #[must_use]
    pub fn outputs(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.outputs.extend(exprs);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn order_by(mut self, expr: Expr, descending: bool) -> Self {
        self.order.push(OrderBy { expr, descending });
        self
    }

    #[must_use]
    pub const fn cap(mut self, rows: u64) -> Self {
        self.row_cap = Some(rows);
        self
    }

    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

///
/// AggregateKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AggregateKind {
    Count,
    Min,
    Max,
    Sum,
}

///
/// AggregateQuery
///
/// Single-value aggregate descriptor. `column` is `None` only for `Count`,
/// which then counts rows.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AggregateQuery {
    pub table: String,
    pub kind: AggregateKind,
    pub column: Option<String>,
    pub filter: Option<Filter>,
}

use crate::{
    expr::Expr,
    filter::Degeneracy,
    id::IdSet,
    value::{ColumnType, Value},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use time::Date;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Whether an ordering outcome satisfies this operator.
    #[must_use]
    pub const fn matches(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ord, Ordering::Equal),
            Self::Ne => !matches!(ord, Ordering::Equal),
            Self::Lt => matches!(ord, Ordering::Less),
            Self::Le => matches!(ord, Ordering::Less | Ordering::Equal),
            Self::Gt => matches!(ord, Ordering::Greater),
            Self::Ge => matches!(ord, Ordering::Greater | Ordering::Equal),
        }
    }
}

///
/// CompareFilter
///
/// Null semantics: two NULL operands compare as equal; one NULL operand
/// never matches, regardless of operator, unless `null_as_default` first
/// substitutes the declared type's zero value for it.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CompareFilter {
    pub left: Expr,
    pub right: Expr,
    pub op: CompareOp,
    pub null_as_default: bool,
    pub ty: ColumnType,
}

///
/// ValuesInFilter
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValuesInFilter {
    pub expr: Expr,
    pub values: Vec<Value>,
    pub ty: ColumnType,
}

///
/// IdsInFilter
///
/// NULL storage values are read as the sentinel id `0`, so an id set
/// containing the sentinel matches top-level rows; formatters must render
/// the sentinel member accordingly.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct IdsInFilter {
    pub expr: Expr,
    pub ids: IdSet,
}

///
/// NumericRangeFilter
///
/// Bounds are inclusive. No bounds at all makes the filter statically true;
/// an inverted pair makes it statically false.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NumericRangeFilter {
    pub expr: Expr,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub ty: ColumnType,
}

///
/// DateSpan
///
/// A possibly open-ended calendar interval, inclusive at both ends.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DateSpan {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl DateSpan {
    #[must_use]
    pub const fn new(from: Option<Date>, to: Option<Date>) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    #[must_use]
    pub fn inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(a), Some(b)) if a > b)
    }
}

///
/// DateRangeFilter
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DateRangeFilter {
    pub expr: Expr,
    pub span: DateSpan,
}

///
/// DateRangeIncludesFilter
///
/// Matches rows whose `[start, end]` period contains `date`. A NULL start
/// or end leaves that side of the period open.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DateRangeIncludesFilter {
    pub start: Expr,
    pub end: Expr,
    pub date: Date,
}

///
/// DateRangeOverlapsFilter
///
/// Matches rows whose `[start, end]` period overlaps `span`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DateRangeOverlapsFilter {
    pub start: Expr,
    pub end: Expr,
    pub span: DateSpan,
}

///
/// TextOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum TextOp {
    Equals,
    StartsWith,
    Contains,
}

///
/// TextFilter
///
/// `StartsWith` with an empty pattern is statically true: the empty pattern
/// matches everything.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TextFilter {
    pub expr: Expr,
    pub op: TextOp,
    pub value: String,
    pub ignore_case: bool,
}

///
/// Filter
///
/// Immutable boolean predicate tree. The combinator constructors
/// (`and_all`, `or_all`, `negate`) perform the algebraic simplifications;
/// directly assembled `And`/`Or`/`Not` nodes are still evaluated correctly
/// but are not normalized.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Filter {
    Constant(bool),
    Compare(CompareFilter),
    ValuesIn(ValuesInFilter),
    IdsIn(IdsInFilter),
    NumericRange(NumericRangeFilter),
    DateRange(DateRangeFilter),
    DateRangeIncludes(DateRangeIncludesFilter),
    DateRangeOverlaps(DateRangeOverlapsFilter),
    Text(TextFilter),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    // ======================================================================
    // Leaf constructors
    // ======================================================================

    /// Comparison between two expressions under a declared type.
    #[must_use]
    pub const fn compare(left: Expr, right: Expr, op: CompareOp, ty: ColumnType) -> Self {
        Self::Compare(CompareFilter {
            left,
            right,
            op,
            null_as_default: false,
            ty,
        })
    }

    /// Comparison that substitutes the type's zero value for NULL operands.
    #[must_use]
    pub const fn compare_null_as_default(
        left: Expr,
        right: Expr,
        op: CompareOp,
        ty: ColumnType,
    ) -> Self {
        Self::Compare(CompareFilter {
            left,
            right,
            op,
            null_as_default: true,
            ty,
        })
    }

    /// Membership in an explicit value list.
    #[must_use]
    pub fn values_in(expr: Expr, values: Vec<Value>, ty: ColumnType) -> Self {
        Self::ValuesIn(ValuesInFilter { expr, values, ty })
    }

    /// Membership in an id set.
    #[must_use]
    pub fn ids_in(expr: Expr, ids: IdSet) -> Self {
        Self::IdsIn(IdsInFilter { expr, ids })
    }

    /// Inclusive numeric range.
    #[must_use]
    pub const fn numeric_range(
        expr: Expr,
        min: Option<Value>,
        max: Option<Value>,
        ty: ColumnType,
    ) -> Self {
        Self::NumericRange(NumericRangeFilter { expr, min, max, ty })
    }

    /// Inclusive date range.
    #[must_use]
    pub const fn date_range(expr: Expr, span: DateSpan) -> Self {
        Self::DateRange(DateRangeFilter { expr, span })
    }

    /// Row period `[start, end]` contains `date`.
    #[must_use]
    pub const fn date_range_includes(start: Expr, end: Expr, date: Date) -> Self {
        Self::DateRangeIncludes(DateRangeIncludesFilter { start, end, date })
    }

    /// Row period `[start, end]` overlaps `span`.
    #[must_use]
    pub const fn date_range_overlaps(start: Expr, end: Expr, span: DateSpan) -> Self {
        Self::DateRangeOverlaps(DateRangeOverlapsFilter { start, end, span })
    }

    /// Text predicate.
    #[must_use]
    pub fn text(expr: Expr, op: TextOp, value: impl Into<String>, ignore_case: bool) -> Self {
        Self::Text(TextFilter {
            expr,
            op,
            value: value.into(),
            ignore_case,
        })
    }

    // ======================================================================
    // Combinators
    // ======================================================================

    /// Conjunction of two filters. See [`Filter::and_all`].
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::and_all(vec![self, other])
    }

    /// Disjunction of two filters. See [`Filter::or_all`].
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::or_all(vec![self, other])
    }

    /// N-ary conjunction.
    ///
    /// Flattens nested `And` children into one node, drops statically-true
    /// children, and short-circuits to `Constant(false)` on any
    /// statically-false child. An empty conjunction is true.
    #[must_use]
    pub fn and_all(children: Vec<Self>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        let mut pending: Vec<Self> = children;
        pending.reverse();

        while let Some(child) = pending.pop() {
            match child.degeneracy() {
                Degeneracy::AlwaysTrue => {}
                Degeneracy::AlwaysFalse => return Self::Constant(false),
                Degeneracy::Normal => {
                    if let Self::And(kids) = child {
                        for kid in kids.into_iter().rev() {
                            pending.push(kid);
                        }
                    } else {
                        flat.push(child);
                    }
                }
            }
        }

        match flat.len() {
            0 => Self::Constant(true),
            1 => flat.pop().unwrap_or(Self::Constant(true)),
            _ => Self::And(flat),
        }
    }

    /// N-ary disjunction, the dual of [`Filter::and_all`].
    ///
    /// Flattens nested `Or` children, drops statically-false children, and
    /// short-circuits to `Constant(true)` on any statically-true child. An
    /// empty disjunction is false.
    #[must_use]
    pub fn or_all(children: Vec<Self>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        let mut pending: Vec<Self> = children;
        pending.reverse();

        while let Some(child) = pending.pop() {
            match child.degeneracy() {
                Degeneracy::AlwaysFalse => {}
                Degeneracy::AlwaysTrue => return Self::Constant(true),
                Degeneracy::Normal => {
                    if let Self::Or(kids) = child {
                        for kid in kids.into_iter().rev() {
                            pending.push(kid);
                        }
                    } else {
                        flat.push(child);
                    }
                }
            }
        }

        match flat.len() {
            0 => Self::Constant(false),
            1 => flat.pop().unwrap_or(Self::Constant(false)),
            _ => Self::Or(flat),
        }
    }

    /// Negation. Collapses `Not(Not(x))` to `x` and folds degenerate
    /// operands into constants.
    #[must_use]
    pub fn negate(self) -> Self {
        match self.degeneracy() {
            Degeneracy::AlwaysTrue => Self::Constant(false),
            Degeneracy::AlwaysFalse => Self::Constant(true),
            Degeneracy::Normal => match self {
                Self::Not(inner) => *inner,
                other => Self::Not(Box::new(other)),
            },
        }
    }
}

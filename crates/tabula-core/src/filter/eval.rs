//! Module: filter::eval
//! Responsibility: direct in-memory predicate evaluation against loaded rows.
//! Does not own: vendor SQL rendering or schema validation.

use crate::{
    expr::{ColumnPath, Expr},
    filter::{
        CompareFilter, DateRangeIncludesFilter, DateRangeOverlapsFilter, Degeneracy, Filter,
        TextOp,
    },
    id::Id,
    value::{ColumnType, Value},
};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use thiserror::Error as ThisError;
use time::Date;

///
/// RowAccessor
///
/// Column access for in-memory evaluation. `None` means the column is not
/// present on the row at all, which is an evaluation error; an absent value
/// is represented by `Value::Null`.
///

pub trait RowAccessor {
    fn value(&self, path: &ColumnPath) -> Option<Value>;
}

impl RowAccessor for std::collections::BTreeMap<String, Value> {
    fn value(&self, path: &ColumnPath) -> Option<Value> {
        self.get(&path.to_string()).cloned()
    }
}

///
/// FilterError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum FilterError {
    #[error("filter references column `{0}` not present on the row")]
    MissingColumn(ColumnPath),

    #[error("operands are not comparable as {ty}: {left:?} vs {right:?}")]
    Incomparable {
        left: Value,
        right: Value,
        ty: ColumnType,
    },

    #[error("expected a date value in column `{0}`")]
    NotADate(ColumnPath),

    #[error("expected a text value in column `{0}`")]
    NotText(ColumnPath),

    #[error("expected an id value in column `{0}`")]
    NotAnId(ColumnPath),
}

impl Filter {
    /// Evaluate this filter against one row, reading only the columns
    /// reported by [`Filter::required_columns`].
    ///
    /// Degenerate filters resolve without touching the row, so a filter
    /// whose degeneracy is `AlwaysTrue` matches every row by construction.
    pub fn matches(&self, row: &dyn RowAccessor) -> Result<bool, FilterError> {
        match self.degeneracy() {
            Degeneracy::AlwaysTrue => return Ok(true),
            Degeneracy::AlwaysFalse => return Ok(false),
            Degeneracy::Normal => {}
        }

        match self {
            // Degenerate constants were handled above.
            Self::Constant(b) => Ok(*b),

            Self::Compare(f) => eval_compare(f, row),

            Self::ValuesIn(f) => {
                let value = resolve(&f.expr, row)?;
                if value.is_null() {
                    return Ok(false);
                }
                for candidate in &f.values {
                    if candidate.is_null() {
                        continue;
                    }
                    match Value::compare(&value, candidate, f.ty) {
                        Some(Ordering::Equal) => return Ok(true),
                        Some(_) => {}
                        None => {
                            return Err(FilterError::Incomparable {
                                left: value,
                                right: candidate.clone(),
                                ty: f.ty,
                            });
                        }
                    }
                }
                Ok(false)
            }

            Self::IdsIn(f) => {
                let value = resolve(&f.expr, row)?;
                let id = Id::from_value(&value).ok_or_else(|| {
                    FilterError::NotAnId(column_of(&f.expr))
                })?;
                Ok(f.ids.contains(&id))
            }

            Self::NumericRange(f) => {
                let value = resolve(&f.expr, row)?;
                if value.is_null() {
                    return Ok(false);
                }
                if let Some(min) = &f.min {
                    match Value::compare(&value, min, f.ty) {
                        Some(Ordering::Less) => return Ok(false),
                        Some(_) => {}
                        None => {
                            return Err(FilterError::Incomparable {
                                left: value,
                                right: min.clone(),
                                ty: f.ty,
                            });
                        }
                    }
                }
                if let Some(max) = &f.max {
                    match Value::compare(&value, max, f.ty) {
                        Some(Ordering::Greater) => return Ok(false),
                        Some(_) => {}
                        None => {
                            return Err(FilterError::Incomparable {
                                left: value,
                                right: max.clone(),
                                ty: f.ty,
                            });
                        }
                    }
                }
                Ok(true)
            }

            Self::DateRange(f) => {
                let Some(date) = resolve_date(&f.expr, row)? else {
                    return Ok(false);
                };
                Ok(f.span.from.is_none_or(|from| date >= from)
                    && f.span.to.is_none_or(|to| date <= to))
            }

            Self::DateRangeIncludes(f) => eval_includes(f, row),
            Self::DateRangeOverlaps(f) => eval_overlaps(f, row),

            Self::Text(f) => {
                let value = resolve(&f.expr, row)?;
                if value.is_null() {
                    return Ok(false);
                }
                let Some(text) = value.as_text() else {
                    return Err(FilterError::NotText(column_of(&f.expr)));
                };
                let (haystack, needle) = if f.ignore_case {
                    (text.to_lowercase(), f.value.to_lowercase())
                } else {
                    (text.to_string(), f.value.clone())
                };
                Ok(match f.op {
                    TextOp::Equals => haystack == needle,
                    TextOp::StartsWith => haystack.starts_with(&needle),
                    TextOp::Contains => haystack.contains(&needle),
                })
            }

            Self::And(children) => {
                for child in children {
                    if !child.matches(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Self::Or(children) => {
                for child in children {
                    if child.matches(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Self::Not(inner) => Ok(!inner.matches(row)?),
        }
    }

    /// Every column path referenced anywhere in this (possibly nested)
    /// filter; order-insensitive and duplicate-free.
    #[must_use]
    pub fn required_columns(&self) -> BTreeSet<ColumnPath> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<ColumnPath>) {
        let mut push = |expr: &Expr| {
            if let Expr::Column(path) = expr {
                out.insert(path.clone());
            }
        };

        match self {
            Self::Constant(_) => {}
            Self::Compare(f) => {
                push(&f.left);
                push(&f.right);
            }
            Self::ValuesIn(f) => push(&f.expr),
            Self::IdsIn(f) => push(&f.expr),
            Self::NumericRange(f) => push(&f.expr),
            Self::DateRange(f) => push(&f.expr),
            Self::DateRangeIncludes(f) => {
                push(&f.start);
                push(&f.end);
            }
            Self::DateRangeOverlaps(f) => {
                push(&f.start);
                push(&f.end);
            }
            Self::Text(f) => push(&f.expr),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            Self::Not(inner) => inner.collect_columns(out),
        }
    }
}

fn column_of(expr: &Expr) -> ColumnPath {
    expr.as_column()
        .cloned()
        .unwrap_or_else(|| ColumnPath::new(["<constant>"]))
}

fn resolve(expr: &Expr, row: &dyn RowAccessor) -> Result<Value, FilterError> {
    match expr {
        Expr::Constant(constant) => Ok(constant.value.clone()),
        Expr::Column(path) => row
            .value(path)
            .ok_or_else(|| FilterError::MissingColumn(path.clone())),
    }
}

/// Resolve an expression to a calendar date, taking the date part of a
/// datetime. `Ok(None)` is a NULL value.
fn resolve_date(expr: &Expr, row: &dyn RowAccessor) -> Result<Option<Date>, FilterError> {
    match resolve(expr, row)? {
        Value::Null => Ok(None),
        Value::Date(date) => Ok(Some(date)),
        Value::DateTime(dt) => Ok(Some(dt.date())),
        _ => Err(FilterError::NotADate(column_of(expr))),
    }
}

fn eval_compare(f: &CompareFilter, row: &dyn RowAccessor) -> Result<bool, FilterError> {
    let mut left = resolve(&f.left, row)?;
    let mut right = resolve(&f.right, row)?;

    if f.null_as_default {
        if left.is_null() {
            left = Value::zero_of(f.ty);
        }
        if right.is_null() {
            right = Value::zero_of(f.ty);
        }
    }

    match (left.is_null(), right.is_null()) {
        (true, true) => Ok(f.op.matches(Ordering::Equal)),
        (true, false) | (false, true) => Ok(false),
        (false, false) => match Value::compare(&left, &right, f.ty) {
            Some(ord) => Ok(f.op.matches(ord)),
            None => Err(FilterError::Incomparable {
                left,
                right,
                ty: f.ty,
            }),
        },
    }
}

fn eval_includes(f: &DateRangeIncludesFilter, row: &dyn RowAccessor) -> Result<bool, FilterError> {
    let start = resolve_date(&f.start, row)?;
    let end = resolve_date(&f.end, row)?;

    Ok(start.is_none_or(|s| s <= f.date) && end.is_none_or(|e| e >= f.date))
}

fn eval_overlaps(f: &DateRangeOverlapsFilter, row: &dyn RowAccessor) -> Result<bool, FilterError> {
    let start = resolve_date(&f.start, row)?;
    let end = resolve_date(&f.end, row)?;

    // Two inclusive periods overlap when each starts no later than the
    // other ends; an open side never excludes.
    let starts_in_time = match (start, f.span.to) {
        (Some(s), Some(to)) => s <= to,
        _ => true,
    };
    let ends_in_time = match (end, f.span.from) {
        (Some(e), Some(from)) => e >= from,
        _ => true,
    };

    Ok(starts_in_time && ends_in_time)
}

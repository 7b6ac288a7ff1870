//! Static degeneracy classification.
//!
//! Degeneracy is computed from filter structure alone, never from data, so
//! callers can prune statements before any SQL is issued.

use crate::filter::{Filter, TextOp};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Degeneracy
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Degeneracy {
    Normal,
    AlwaysTrue,
    AlwaysFalse,
}

impl Degeneracy {
    /// The classification of a negated filter.
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Self::Normal => Self::Normal,
            Self::AlwaysTrue => Self::AlwaysFalse,
            Self::AlwaysFalse => Self::AlwaysTrue,
        }
    }
}

impl Filter {
    /// Static classification of this filter.
    #[must_use]
    pub fn degeneracy(&self) -> Degeneracy {
        match self {
            Self::Constant(true) => Degeneracy::AlwaysTrue,
            Self::Constant(false) => Degeneracy::AlwaysFalse,

            Self::Compare(_) | Self::DateRangeIncludes(_) => Degeneracy::Normal,

            Self::ValuesIn(f) if f.values.is_empty() => Degeneracy::AlwaysFalse,
            Self::ValuesIn(_) => Degeneracy::Normal,

            Self::IdsIn(f) if f.ids.is_empty() => Degeneracy::AlwaysFalse,
            Self::IdsIn(_) => Degeneracy::Normal,

            Self::NumericRange(f) => match (&f.min, &f.max) {
                (None, None) => Degeneracy::AlwaysTrue,
                (Some(min), Some(max)) => {
                    if Value::compare(min, max, f.ty) == Some(Ordering::Greater) {
                        Degeneracy::AlwaysFalse
                    } else {
                        Degeneracy::Normal
                    }
                }
                _ => Degeneracy::Normal,
            },

            Self::DateRange(f) => span_degeneracy(f.span.unbounded(), f.span.inverted()),
            Self::DateRangeOverlaps(f) => span_degeneracy(f.span.unbounded(), f.span.inverted()),

            // The empty pattern matches everything, NULL included.
            Self::Text(f) if f.op == TextOp::StartsWith && f.value.is_empty() => {
                Degeneracy::AlwaysTrue
            }
            Self::Text(_) => Degeneracy::Normal,

            Self::And(children) => {
                let mut all_true = true;
                for child in children {
                    match child.degeneracy() {
                        Degeneracy::AlwaysFalse => return Degeneracy::AlwaysFalse,
                        Degeneracy::Normal => all_true = false,
                        Degeneracy::AlwaysTrue => {}
                    }
                }
                if all_true {
                    Degeneracy::AlwaysTrue
                } else {
                    Degeneracy::Normal
                }
            }

            Self::Or(children) => {
                let mut all_false = true;
                for child in children {
                    match child.degeneracy() {
                        Degeneracy::AlwaysTrue => return Degeneracy::AlwaysTrue,
                        Degeneracy::Normal => all_false = false,
                        Degeneracy::AlwaysFalse => {}
                    }
                }
                if all_false {
                    Degeneracy::AlwaysFalse
                } else {
                    Degeneracy::Normal
                }
            }

            Self::Not(inner) => inner.degeneracy().inverted(),
        }
    }
}

const fn span_degeneracy(unbounded: bool, inverted: bool) -> Degeneracy {
    if unbounded {
        Degeneracy::AlwaysTrue
    } else if inverted {
        Degeneracy::AlwaysFalse
    } else {
        Degeneracy::Normal
    }
}

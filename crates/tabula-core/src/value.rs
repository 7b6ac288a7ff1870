//! Module: value
//! Responsibility: runtime scalar values and the logical column-type system.
//! Does not own: vendor rendering of values (formatter) or schema legality
//! checks (validate).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

///
/// ColumnType
///
/// Logical type tags carried by column descriptors, constants and filters.
/// `Memo` and `Xml` are storage classes of text: they share the `Value::Text`
/// runtime representation and differ only in declared shape and rendering.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ColumnType {
    Text,
    Int,
    Float,
    Money,
    Boolean,
    Date,
    DateTime,
    Time,
    Guid,
    Memo,
    Xml,
    Binary,
}

impl ColumnType {
    /// Returns true for the numeric storage classes.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Money)
    }

    /// Returns true for the text storage classes.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Memo | Self::Xml)
    }

    /// Returns true for the calendar/clock storage classes.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime | Self::Time)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Float => "float",
            Self::Money => "money",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Guid => "guid",
            Self::Memo => "memo",
            Self::Xml => "xml",
            Self::Binary => "binary",
        };
        write!(f, "{name}")
    }
}

///
/// Value
///
/// Runtime scalar. `Null` is the universal absent value; every other variant
/// corresponds to one or more `ColumnType` tags.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Money(Decimal),
    Boolean(bool),
    Date(Date),
    DateTime(PrimitiveDateTime),
    Time(Time),
    Guid(Uuid),
    Binary(Vec<u8>),
}

const EPOCH_DATE: Date = match Date::from_ordinal_date(1970, 1) {
    Ok(date) => date,
    Err(_) => panic!("constant epoch date is valid"),
};

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The declared type's zero/empty value.
    ///
    /// This is the substitution applied by `null_as_default` comparisons and
    /// is also the value written for defaulted columns with no explicit
    /// default.
    #[must_use]
    pub fn zero_of(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Text | ColumnType::Memo | ColumnType::Xml => Self::Text(String::new()),
            ColumnType::Int => Self::Int(0),
            ColumnType::Float => Self::Float(0.0),
            ColumnType::Money => Self::Money(Decimal::ZERO),
            ColumnType::Boolean => Self::Boolean(false),
            ColumnType::Date => Self::Date(EPOCH_DATE),
            ColumnType::DateTime => Self::DateTime(PrimitiveDateTime::new(EPOCH_DATE, Time::MIDNIGHT)),
            ColumnType::Time => Self::Time(Time::MIDNIGHT),
            ColumnType::Guid => Self::Guid(Uuid::nil()),
            ColumnType::Binary => Self::Binary(Vec::new()),
        }
    }

    /// Whether this value can be stored in a column of the given type.
    ///
    /// `Null` matches every type; nullability is a descriptor concern, not a
    /// value concern.
    #[must_use]
    pub const fn matches_type(&self, ty: ColumnType) -> bool {
        match self {
            Self::Null => true,
            Self::Text(_) => ty.is_text(),
            Self::Int(_) => matches!(ty, ColumnType::Int),
            Self::Float(_) => matches!(ty, ColumnType::Float),
            Self::Money(_) => matches!(ty, ColumnType::Money),
            Self::Boolean(_) => matches!(ty, ColumnType::Boolean),
            Self::Date(_) => matches!(ty, ColumnType::Date),
            Self::DateTime(_) => matches!(ty, ColumnType::DateTime),
            Self::Time(_) => matches!(ty, ColumnType::Time),
            Self::Guid(_) => matches!(ty, ColumnType::Guid),
            Self::Binary(_) => matches!(ty, ColumnType::Binary),
        }
    }

    /// Compare two non-null values under a declared type.
    ///
    /// Coercions follow the declared type, not the operand variants:
    /// `Float` comparisons widen `Int` operands to `f64`, `Money`
    /// comparisons widen `Int` operands to `Decimal`. Everything else
    /// requires matching variants. Returns `None` when either operand is
    /// `Null` or not coercible to the declared type.
    #[must_use]
    pub fn compare(left: &Self, right: &Self, ty: ColumnType) -> Option<Ordering> {
        if left.is_null() || right.is_null() {
            return None;
        }

        match ty {
            ColumnType::Text | ColumnType::Memo | ColumnType::Xml => {
                match (left, right) {
                    (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
                    _ => None,
                }
            }
            ColumnType::Int => match (left, right) {
                (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
                _ => None,
            },
            ColumnType::Float => {
                let a = left.as_f64()?;
                let b = right.as_f64()?;
                a.partial_cmp(&b)
            }
            ColumnType::Money => {
                let a = left.as_decimal()?;
                let b = right.as_decimal()?;
                Some(a.cmp(&b))
            }
            ColumnType::Boolean => match (left, right) {
                (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
                _ => None,
            },
            ColumnType::Date => match (left, right) {
                (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
                _ => None,
            },
            ColumnType::DateTime => match (left, right) {
                (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
                _ => None,
            },
            ColumnType::Time => match (left, right) {
                (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
                _ => None,
            },
            ColumnType::Guid => match (left, right) {
                (Self::Guid(a), Self::Guid(b)) => Some(a.cmp(b)),
                _ => None,
            },
            ColumnType::Binary => match (left, right) {
                (Self::Binary(a), Self::Binary(b)) => Some(a.cmp(b)),
                _ => None,
            },
        }
    }

    /// Equality of two text values under an optional casefold.
    ///
    /// Returns `None` unless both operands are text.
    #[must_use]
    pub fn text_eq(left: &Self, right: &Self, ignore_case: bool) -> Option<bool> {
        let (Self::Text(a), Self::Text(b)) = (left, right) else {
            return None;
        };

        if ignore_case {
            Some(a.to_lowercase() == b.to_lowercase())
        } else {
            Some(a == b)
        }
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Widen to `f64` for `Float`-typed comparison.
    #[must_use]
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Widen to `Decimal` for `Money`-typed comparison.
    #[must_use]
    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Money(d) => Some(*d),
            Self::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Money(d) => write!(f, "{d}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::Guid(g) => write!(f, "{g}"),
            Self::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

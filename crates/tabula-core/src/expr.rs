//! Module: expr
//! Responsibility: scalar expression model — column-path references and
//! typed constants.
//! Does not own: boolean predicates (filter) or vendor rendering (formatter).

use crate::value::{ColumnType, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// ColumnPath
///
/// Ordered, non-empty identifier chain. A single segment names a column of
/// the query's table; every additional leading segment is one foreign-key
/// traversal hop. Path resolution is a chain of single-column lookups, one
/// per hop — never a join.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ColumnPath(Vec<String>);

impl ColumnPath {
    /// Build a path from pre-split segments.
    ///
    /// Empty segment lists and empty segments are rejected at validation
    /// time, not here; construction stays infallible for ergonomic use.
    #[must_use]
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a dotted path such as `"owner.company.name"`.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        Self(dotted.split('.').map(str::to_string).collect())
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The final segment: the concrete column the path lands on.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// True when the path is a plain column with no traversal hops.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.0.len() == 1
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for ColumnPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

///
/// Constant
///
/// A literal operand with its declared type. The declared type drives
/// comparison coercion and vendor rendering; it is not inferred from the
/// value variant.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Constant {
    pub value: Value,
    pub ty: ColumnType,
}

impl Constant {
    #[must_use]
    pub const fn new(value: Value, ty: ColumnType) -> Self {
        Self { value, ty }
    }

    #[must_use]
    pub const fn null(ty: ColumnType) -> Self {
        Self {
            value: Value::Null,
            ty,
        }
    }
}

///
/// Expr
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Expr {
    Column(ColumnPath),
    Constant(Constant),
}

impl Expr {
    /// Column reference from a dotted path.
    #[must_use]
    pub fn column(dotted: &str) -> Self {
        Self::Column(ColumnPath::parse(dotted))
    }

    /// Typed literal.
    #[must_use]
    pub fn constant(value: impl Into<Value>, ty: ColumnType) -> Self {
        Self::Constant(Constant::new(value.into(), ty))
    }

    #[must_use]
    pub const fn as_column(&self) -> Option<&ColumnPath> {
        match self {
            Self::Column(path) => Some(path),
            Self::Constant(_) => None,
        }
    }

    #[must_use]
    pub const fn as_constant(&self) -> Option<&Constant> {
        match self {
            Self::Constant(constant) => Some(constant),
            Self::Column(_) => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(path) => write!(f, "{path}"),
            Self::Constant(constant) => write!(f, "{}:{}", constant.value, constant.ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_parse_round_trips() {
        let path = ColumnPath::parse("owner.company.name");
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.leaf(), "name");
        assert!(!path.is_simple());
        assert_eq!(path.to_string(), "owner.company.name");
    }

    #[test]
    fn simple_path_has_one_segment() {
        let path = ColumnPath::parse("name");
        assert!(path.is_simple());
        assert_eq!(path.leaf(), "name");
    }
}

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

///
/// Id
///
/// Int32 primary-key value. `0` is reserved as the "no record" sentinel
/// across every Int32-keyed operation; it is never a stored row id.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct Id(i32);

impl Id {
    /// The reserved "no record" value.
    pub const SENTINEL: Self = Self(0);

    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        self.0 == 0
    }

    /// The next sequential id.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub fn to_value(self) -> Value {
        Value::Int(i64::from(self.0))
    }

    /// Read an id back out of a storage value.
    ///
    /// NULL maps to the sentinel; out-of-range integers are rejected.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::SENTINEL),
            Value::Int(i) => i32::try_from(*i).ok().map(Self),
            _ => None,
        }
    }
}

/// Ordered, duplicate-free id collection used by IN-list operations.
pub type IdSet = BTreeSet<Id>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trip() {
        assert!(Id::SENTINEL.is_sentinel());
        assert_eq!(Id::from_value(&Value::Null), Some(Id::SENTINEL));
        assert_eq!(Id::from_value(&Value::Int(7)), Some(Id::new(7)));
        assert_eq!(Id::from_value(&Value::from("7")), None);
    }
}

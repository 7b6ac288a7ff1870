use crate::value::{ColumnType, Value};
use serde::{Deserialize, Serialize};

///
/// DeleteRule
///
/// What happens to referencing rows when the referenced row is deleted.
/// `Emulated` marks constraints enforced by this layer rather than by the
/// vendor engine.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DeleteRule {
    Disallow,
    Cascade,
    ClearReference,
    Emulated,
}

///
/// ForeignKey
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ForeignKey {
    pub table: String,
    pub on_delete: DeleteRule,
}

///
/// Absence
///
/// How a column behaves when a write supplies no value. Nullability and a
/// default value are mutually exclusive, so they are one field, not two
/// flags.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Absence {
    /// A value must always be supplied.
    Required,
    /// NULL is stored.
    Nullable,
    /// The default is stored.
    Default(Value),
}

///
/// NumericBounds
///
/// Inclusive value bounds for numeric columns.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NumericBounds {
    pub min: Option<Value>,
    pub max: Option<Value>,
}

///
/// ColumnDescriptor
///
/// Immutable once its table is sealed. Built fluently; structural checks
/// run at table seal time.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    name: String,
    ty: ColumnType,
    absence: Absence,
    bounds: Option<NumericBounds>,
    max_len: Option<usize>,
    foreign_key: Option<ForeignKey>,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            absence: Absence::Required,
            bounds: None,
            max_len: None,
            foreign_key: None,
        }
    }

    // ======================================================================
    // Fluent construction
    // ======================================================================

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.absence = Absence::Nullable;
        self
    }

    /// Store `value` when a write supplies none. Replaces nullability.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.absence = Absence::Default(value);
        self
    }

    #[must_use]
    pub fn bounds(mut self, min: Option<Value>, max: Option<Value>) -> Self {
        self.bounds = Some(NumericBounds { min, max });
        self
    }

    #[must_use]
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Declare this column a foreign key to `table`'s primary key.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, on_delete: DeleteRule) -> Self {
        self.foreign_key = Some(ForeignKey {
            table: table.into(),
            on_delete,
        });
        self
    }

    // ======================================================================
    // Accessors
    // ======================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn ty(&self) -> ColumnType {
        self.ty
    }

    #[must_use]
    pub const fn absence(&self) -> &Absence {
        &self.absence
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self.absence, Absence::Nullable)
    }

    #[must_use]
    pub const fn numeric_bounds(&self) -> Option<&NumericBounds> {
        self.bounds.as_ref()
    }

    #[must_use]
    pub const fn text_max_len(&self) -> Option<usize> {
        self.max_len
    }

    #[must_use]
    pub const fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }
}

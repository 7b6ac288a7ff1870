use crate::{
    schema::column::{Absence, ColumnDescriptor},
    validate::identifier_ok,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// SchemaError
///
/// Structural defects caught when a descriptor is sealed.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("table `{0}` declares no columns")]
    NoColumns(String),

    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("table `{table}` declares column `{column}` twice")]
    DuplicateColumn { table: String, column: String },

    #[error("table `{table}` names unknown column `{column}` in its primary key")]
    UnknownPrimaryKeyColumn { table: String, column: String },

    #[error("index `{index}` on `{table}` names unknown column `{column}`")]
    UnknownIndexColumn {
        table: String,
        index: String,
        column: String,
    },

    #[error("default for `{table}.{column}` does not match the column type")]
    DefaultTypeMismatch { table: String, column: String },

    #[error("catalog already contains a table named `{0}`")]
    DuplicateTable(String),

    #[error("`{table}.{column}` references unknown table `{target}`")]
    UnknownForeignTable {
        table: String,
        column: String,
        target: String,
    },
}

///
/// IndexDescriptor
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

///
/// TableDescriptor
///
/// Sealed table metadata. Only [`TableBuilder::seal`] produces one; there
/// is no mutation after that.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Vec<String>,
    indexes: Vec<IndexDescriptor>,
    auto_create: bool,
}

impl TableDescriptor {
    /// Start building a descriptor for `name`.
    #[must_use]
    pub fn build(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            auto_create: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name() == name)
    }

    /// Primary-key column names, in declaration order.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// The single primary-key column, when the key is not composite.
    #[must_use]
    pub fn single_key_column(&self) -> Option<&ColumnDescriptor> {
        match self.primary_key.as_slice() {
            [only] => self.column(only),
            _ => None,
        }
    }

    /// Whether the primary key is one Int column — the shape the sentinel-id
    /// operations and the batched existence probes require.
    #[must_use]
    pub fn has_int_single_key(&self) -> bool {
        self.single_key_column()
            .is_some_and(|column| column.ty() == crate::value::ColumnType::Int)
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexDescriptor] {
        &self.indexes
    }

    #[must_use]
    pub const fn auto_create(&self) -> bool {
        self.auto_create
    }
}

///
/// TableBuilder
///

#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Vec<String>,
    indexes: Vec<IndexDescriptor>,
    auto_create: bool,
}

impl TableBuilder {
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Override the primary key; the default is the first declared column.
    #[must_use]
    pub fn primary_key(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub const fn auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// Validate and freeze the descriptor.
    pub fn seal(self) -> Result<TableDescriptor, SchemaError> {
        if !identifier_ok(&self.name) {
            return Err(SchemaError::InvalidIdentifier(self.name));
        }
        if self.columns.is_empty() {
            return Err(SchemaError::NoColumns(self.name));
        }

        for (i, column) in self.columns.iter().enumerate() {
            if !identifier_ok(column.name()) {
                return Err(SchemaError::InvalidIdentifier(column.name().to_string()));
            }
            if self.columns[..i].iter().any(|c| c.name() == column.name()) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.name,
                    column: column.name().to_string(),
                });
            }
            if let Absence::Default(value) = column.absence() {
                if !value.matches_type(column.ty()) || value.is_null() {
                    return Err(SchemaError::DefaultTypeMismatch {
                        table: self.name,
                        column: column.name().to_string(),
                    });
                }
            }
        }

        // The first column is the key unless one was declared.
        let primary_key = if self.primary_key.is_empty() {
            vec![self.columns[0].name().to_string()]
        } else {
            self.primary_key
        };

        for key_column in &primary_key {
            if !self.columns.iter().any(|c| c.name() == key_column) {
                return Err(SchemaError::UnknownPrimaryKeyColumn {
                    table: self.name,
                    column: key_column.clone(),
                });
            }
        }

        for index in &self.indexes {
            for index_column in &index.columns {
                if !self.columns.iter().any(|c| c.name() == index_column) {
                    return Err(SchemaError::UnknownIndexColumn {
                        table: self.name,
                        index: index.name.clone(),
                        column: index_column.clone(),
                    });
                }
            }
        }

        Ok(TableDescriptor {
            name: self.name,
            columns: self.columns,
            primary_key,
            indexes: self.indexes,
            auto_create: self.auto_create,
        })
    }
}

//! Module: validate
//! Responsibility: identifier, schema and access checks applied before any
//! SQL is issued.
//! Does not own: descriptor construction (schema) or failure diagnostics
//! attached at dispatch time (engine).

use crate::{
    expr::{ColumnPath, Expr},
    filter::Filter,
    query::SelectQuery,
    schema::{ColumnDescriptor, SchemaCatalog, TableDescriptor},
    value::{ColumnType, Value},
};
use thiserror::Error as ThisError;

///
/// Access
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    Read,
    Write,
}

///
/// ValidateError
///
/// Fail-fast usage errors. Never retried, never wrapped in storage context:
/// nothing has been sent to the resource when one of these is raised.
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ValidateError {
    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error("unknown column `{table}.{column}`")]
    UnknownColumn { table: String, column: String },

    #[error("`{table}.{column}` is not a foreign key; cannot traverse `{path}`")]
    NotAForeignKey {
        table: String,
        column: String,
        path: ColumnPath,
    },

    #[error("dotted path `{0}` is only valid in point reads")]
    DottedPathNotAllowed(ColumnPath),

    #[error("write access to `{0}` denied: engine is read-only")]
    WriteDenied(String),

    #[error("write to `{table}` names no columns")]
    EmptyWrite { table: String },

    #[error("row has {got} values for {expected} columns on `{table}`")]
    ColumnCountMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("value {value:?} does not fit `{table}.{column}` ({expected})")]
    TypeMismatch {
        table: String,
        column: String,
        expected: ColumnType,
        value: Value,
    },

    #[error("`{table}.{column}` is not nullable")]
    NotNullable { table: String, column: String },

    #[error("`{table}.{column}` is not numeric")]
    NotNumeric { table: String, column: String },

    #[error("`{table}.{column}` is not a binary column")]
    NotBinary { table: String, column: String },

    #[error("`{table}.{column}` does not reference its own table")]
    NotSelfReferencing { table: String, column: String },
}

/// Identifier syntax: leading alphabetic or underscore, then alphanumerics
/// or underscores.
#[must_use]
pub fn identifier_ok(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Look a table up, rejecting malformed names before the catalog is probed.
pub fn require_table<'a>(
    catalog: &'a SchemaCatalog,
    name: &str,
) -> Result<&'a TableDescriptor, ValidateError> {
    if !identifier_ok(name) {
        return Err(ValidateError::InvalidIdentifier(name.to_string()));
    }
    catalog
        .table(name)
        .ok_or_else(|| ValidateError::UnknownTable(name.to_string()))
}

pub fn require_column<'a>(
    table: &'a TableDescriptor,
    name: &str,
) -> Result<&'a ColumnDescriptor, ValidateError> {
    if !identifier_ok(name) {
        return Err(ValidateError::InvalidIdentifier(name.to_string()));
    }
    table
        .column(name)
        .ok_or_else(|| ValidateError::UnknownColumn {
            table: table.name().to_string(),
            column: name.to_string(),
        })
}

///
/// PathHop
///
/// One foreign-key traversal step of a dotted path.
///

#[derive(Clone, Copy, Debug)]
pub struct PathHop<'a> {
    pub table: &'a TableDescriptor,
    pub column: &'a ColumnDescriptor,
    pub target: &'a TableDescriptor,
}

///
/// ResolvedPath
///

#[derive(Clone, Debug)]
pub struct ResolvedPath<'a> {
    pub hops: Vec<PathHop<'a>>,
    pub leaf_table: &'a TableDescriptor,
    pub leaf_column: &'a ColumnDescriptor,
}

/// Resolve a dotted path from `table`, hop by hop.
///
/// Every segment but the last must be a foreign-key column; the target of
/// each hop becomes the table of the next segment.
pub fn resolve_path<'a>(
    catalog: &'a SchemaCatalog,
    table: &'a TableDescriptor,
    path: &ColumnPath,
) -> Result<ResolvedPath<'a>, ValidateError> {
    let segments = path.segments();
    let Some((leaf_name, hop_names)) = segments.split_last() else {
        return Err(ValidateError::InvalidIdentifier(String::new()));
    };

    let mut current = table;
    let mut hops = Vec::with_capacity(hop_names.len());

    for hop_name in hop_names {
        let column = require_column(current, hop_name)?;
        let Some(fk) = column.foreign_key() else {
            return Err(ValidateError::NotAForeignKey {
                table: current.name().to_string(),
                column: column.name().to_string(),
                path: path.clone(),
            });
        };
        let target = require_table(catalog, &fk.table)?;
        hops.push(PathHop {
            table: current,
            column,
            target,
        });
        current = target;
    }

    let leaf_column = require_column(current, leaf_name)?;

    Ok(ResolvedPath {
        hops,
        leaf_table: current,
        leaf_column,
    })
}

/// Reject writes on a read-only engine.
pub fn check_access(
    access: Access,
    read_only: bool,
    table: &TableDescriptor,
) -> Result<(), ValidateError> {
    if access == Access::Write && read_only {
        return Err(ValidateError::WriteDenied(table.name().to_string()));
    }
    Ok(())
}

/// Resolve a write column list: non-empty, every name declared.
pub fn check_write_columns<'a>(
    table: &'a TableDescriptor,
    columns: &[String],
) -> Result<Vec<&'a ColumnDescriptor>, ValidateError> {
    if columns.is_empty() {
        return Err(ValidateError::EmptyWrite {
            table: table.name().to_string(),
        });
    }
    columns
        .iter()
        .map(|name| require_column(table, name))
        .collect()
}

/// Check one row of written values against its column descriptors.
pub fn check_row(
    table: &TableDescriptor,
    columns: &[&ColumnDescriptor],
    values: &[Value],
) -> Result<(), ValidateError> {
    if values.len() != columns.len() {
        return Err(ValidateError::ColumnCountMismatch {
            table: table.name().to_string(),
            expected: columns.len(),
            got: values.len(),
        });
    }

    for (column, value) in columns.iter().zip(values) {
        if value.is_null() {
            if !column.is_nullable() {
                return Err(ValidateError::NotNullable {
                    table: table.name().to_string(),
                    column: column.name().to_string(),
                });
            }
            continue;
        }
        if !value.matches_type(column.ty()) {
            return Err(ValidateError::TypeMismatch {
                table: table.name().to_string(),
                column: column.name().to_string(),
                expected: column.ty(),
                value: value.clone(),
            });
        }
    }

    Ok(())
}

/// Check that every column a filter touches is a declared, simple column.
///
/// Dotted paths resolve as chains of point lookups and never render into a
/// single statement, so they are rejected everywhere a filter reaches SQL.
pub fn check_filter(table: &TableDescriptor, filter: &Filter) -> Result<(), ValidateError> {
    for path in filter.required_columns() {
        if !path.is_simple() {
            return Err(ValidateError::DottedPathNotAllowed(path));
        }
        require_column(table, path.leaf())?;
    }
    Ok(())
}

/// Validate a full query descriptor against the catalog.
pub fn check_query<'a>(
    catalog: &'a SchemaCatalog,
    query: &SelectQuery,
) -> Result<&'a TableDescriptor, ValidateError> {
    let table = require_table(catalog, &query.table)?;

    for output in &query.outputs {
        check_simple_expr(table, output)?;
    }
    if let Some(filter) = &query.filter {
        check_filter(table, filter)?;
    }
    for order in &query.order {
        check_simple_expr(table, &order.expr)?;
    }

    Ok(table)
}

fn check_simple_expr(table: &TableDescriptor, expr: &Expr) -> Result<(), ValidateError> {
    if let Expr::Column(path) = expr {
        if !path.is_simple() {
            return Err(ValidateError::DottedPathNotAllowed(path.clone()));
        }
        require_column(table, path.leaf())?;
    }
    Ok(())
}

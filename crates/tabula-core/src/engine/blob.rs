//! BLOB column reads and writes.

use crate::{
    engine::{Engine, read::key_filter},
    error::{Error, Result},
    expr::Expr,
    format::SqlFormatter,
    id::Id,
    query::SelectQuery,
    resource::StorageResource,
    validate::{self, Access, ValidateError},
    value::{ColumnType, Value},
};

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    /// Read one binary column of one record. `None` is a stored NULL.
    ///
    /// The sentinel id reads as absent without issuing SQL, like every
    /// other point read.
    pub fn read_blob(&mut self, table: &str, id: Id, column: &str) -> Result<Option<Vec<u8>>> {
        let catalog = self.catalog.clone();
        let table = validate::require_table(&catalog, table)?;
        validate::check_access(Access::Read, false, table)?;
        let descriptor = require_binary(table, column)?;
        let key = self.int_key_column(table)?.name().to_string();

        if id.is_sentinel() {
            return Ok(None);
        }

        let query = SelectQuery::new(table.name())
            .output(Expr::column(descriptor.name()))
            .filter(key_filter(&key, id));
        let statement = self.formatter.select(&query)?;
        let rows = self.run_rows(&statement)?;

        let value = rows
            .scalar()
            .cloned()
            .ok_or_else(|| Error::RecordNotFound {
                table: table.name().to_string(),
                id,
            })?;

        match value {
            Value::Null => Ok(None),
            Value::Binary(bytes) => Ok(Some(bytes)),
            other => Err(ValidateError::TypeMismatch {
                table: table.name().to_string(),
                column: column.to_string(),
                expected: ColumnType::Binary,
                value: other,
            }
            .into()),
        }
    }

    /// Write one binary column of one record. Never retried.
    pub fn write_blob(
        &mut self,
        table: &str,
        id: Id,
        column: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let catalog = self.catalog.clone();
        let table = validate::require_table(&catalog, table)?;
        validate::check_access(Access::Write, self.options.read_only, table)?;
        let descriptor = require_binary(table, column)?;
        let key = self.int_key_column(table)?.name().to_string();
        let table_name = table.name().to_string();

        if id.is_sentinel() {
            return Err(Error::NoIdArgument { table: table_name });
        }

        let assignments = [(descriptor.name().to_string(), Value::Binary(bytes))];
        let statement = self
            .formatter
            .update(&table_name, &assignments, &key_filter(&key, id))?;

        match self.run_nonquery(&statement)? {
            0 => Err(Error::RecordNotFound {
                table: table_name,
                id,
            }),
            _ => Ok(()),
        }
    }
}

fn require_binary<'a>(
    table: &'a crate::schema::TableDescriptor,
    column: &str,
) -> Result<&'a crate::schema::ColumnDescriptor> {
    let descriptor = validate::require_column(table, column)?;
    if descriptor.ty() != ColumnType::Binary {
        return Err(ValidateError::NotBinary {
            table: table.name().to_string(),
            column: column.to_string(),
        }
        .into());
    }
    Ok(descriptor)
}

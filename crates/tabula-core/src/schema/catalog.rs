use crate::schema::{SchemaError, TableDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// SchemaCatalog
///
/// The sealed set of table descriptors one resource serves. Built once,
/// shared behind `Arc` by every engine bound to that resource.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SchemaCatalog {
    tables: BTreeMap<String, TableDescriptor>,
}

impl SchemaCatalog {
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder { tables: Vec::new() }
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    #[must_use]
    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

///
/// CatalogBuilder
///

#[derive(Debug)]
pub struct CatalogBuilder {
    tables: Vec<TableDescriptor>,
}

impl CatalogBuilder {
    #[must_use]
    pub fn table(mut self, table: TableDescriptor) -> Self {
        self.tables.push(table);
        self
    }

    /// Validate cross-table references and freeze the catalog.
    pub fn seal(self) -> Result<SchemaCatalog, SchemaError> {
        let mut tables = BTreeMap::new();
        for table in self.tables {
            if tables.contains_key(table.name()) {
                return Err(SchemaError::DuplicateTable(table.name().to_string()));
            }
            tables.insert(table.name().to_string(), table);
        }

        for table in tables.values() {
            for column in table.columns() {
                if let Some(fk) = column.foreign_key() {
                    if !tables.contains_key(&fk.table) {
                        return Err(SchemaError::UnknownForeignTable {
                            table: table.name().to_string(),
                            column: column.name().to_string(),
                            target: fk.table.clone(),
                        });
                    }
                }
            }
        }

        Ok(SchemaCatalog { tables })
    }
}

//! Hierarchical id expansion over a self-referencing parent column.

use crate::{
    engine::Engine,
    error::{Error, Result},
    expr::Expr,
    format::SqlFormatter,
    id::{Id, IdSet},
    idbatch::IdBatcher,
    resource::StorageResource,
    validate::{self, Access, ValidateError},
    value::ColumnType,
};

///
/// IdExpansion
///
/// The descendants found plus the first id that closed a cycle, when one
/// exists. The anchor is reported exactly once even when several cycles
/// are present.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdExpansion {
    pub ids: IdSet,
    pub loop_anchor: Option<Id>,
}

impl<R: StorageResource, F: SqlFormatter> Engine<R, F> {
    /// Expand the descendants of `root` through `parent_column`,
    /// breadth-first level by level.
    ///
    /// Root `0` expands the top level. With `nested` false only the first
    /// level is returned. An id that would be revisited — the root
    /// reappearing as its own descendant included — is excluded from the
    /// result and recorded as the loop anchor, so expansion always
    /// terminates.
    pub fn expand_ids(
        &mut self,
        table: &str,
        parent_column: &str,
        root: Id,
        nested: bool,
    ) -> Result<IdExpansion> {
        let catalog = self.catalog.clone();
        let table = validate::require_table(&catalog, table)?;
        validate::check_access(Access::Read, false, table)?;
        self.int_key_column(table)?;

        let parent = validate::require_column(table, parent_column)?;
        if parent.ty() != ColumnType::Int {
            return Err(Error::PrimaryKeyShape {
                table: table.name().to_string(),
                reason: format!("parent column `{parent_column}` must be Int"),
            });
        }
        if let Some(fk) = parent.foreign_key() {
            if fk.table != table.name() {
                return Err(ValidateError::NotSelfReferencing {
                    table: table.name().to_string(),
                    column: parent_column.to_string(),
                }
                .into());
            }
        }

        let table_name = table.name().to_string();
        let mut expansion = IdExpansion::default();
        let mut visited: IdSet = IdSet::new();
        visited.insert(root);
        let mut level: IdSet = visited.clone();

        loop {
            let mut next_level = IdSet::new();
            let batcher = IdBatcher::new(&level);

            for filter in batcher.filters(&Expr::column(parent_column)) {
                for child in self.read_ids(&table_name, &filter)? {
                    if visited.insert(child) {
                        expansion.ids.insert(child);
                        next_level.insert(child);
                    } else if expansion.loop_anchor.is_none() {
                        expansion.loop_anchor = Some(child);
                    }
                }
            }

            if !nested || next_level.is_empty() {
                break;
            }
            level = next_level;
        }

        Ok(expansion)
    }
}

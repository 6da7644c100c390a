//! In-place column evolution of an existing table record.
//!
//! The new descriptor's columns are matched against the table's by name and
//! position. Only two kinds of change are ever applied: appending a column
//! that readers can fill for old data, and updating the comment of a column
//! whose type is unchanged. Columns are never removed from a table; a schema
//! that no longer mentions one is refused and the table keeps it.

use std::fmt;

use tracing::debug;

use super::properties::{SCHEMA_LITERAL, SCHEMA_URL};
use super::{Column, TableRecord};
use crate::descriptor::DatasetDescriptor;
use crate::error::{EvolutionError, Result};
use crate::schema::convert::to_columns;
use crate::schema::type_string::same_type;

/// One column-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnChange {
    /// Append a column after every existing column.
    Add(Column),
    /// Replace the comment of the column at `position`.
    UpdateComment {
        position: usize,
        comment: Option<String>,
    },
}

impl fmt::Display for ColumnChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnChange::Add(column) => write!(f, "ADD COLUMN {} {}", column.name, column.data_type),
            ColumnChange::UpdateComment { position, comment } => match comment {
                Some(comment) => write!(f, "COMMENT ON COLUMN #{position} '{comment}'"),
                None => write!(f, "DROP COMMENT ON COLUMN #{position}"),
            },
        }
    }
}

/// The ordered set of changes that brings a table in line with a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDiff {
    changes: Vec<ColumnChange>,
}

impl ColumnDiff {
    pub fn changes(&self) -> &[ColumnChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn added(&self) -> impl Iterator<Item = &Column> {
        self.changes.iter().filter_map(|change| match change {
            ColumnChange::Add(column) => Some(column),
            ColumnChange::UpdateComment { .. } => None,
        })
    }

    /// Apply every change to `columns`. The diff must have been computed
    /// against these columns.
    fn apply_to(&self, columns: &mut Vec<Column>) {
        for change in &self.changes {
            match change {
                ColumnChange::Add(column) => columns.push(column.clone()),
                ColumnChange::UpdateComment { position, comment } => {
                    if let Some(column) = columns.get_mut(*position) {
                        column.comment = comment.clone();
                    }
                }
            }
        }
    }
}

/// Compute the changes needed for `table` to describe `descriptor`'s schema,
/// without touching the table.
pub fn compute_diff(table: &TableRecord, descriptor: &DatasetDescriptor) -> Result<ColumnDiff> {
    if let Some(location) = table.properties.get_str(&SCHEMA_URL) {
        return Err(EvolutionError::PinnedSchemaNotEvolvable {
            table: table.qualified_name(),
            location: location.to_string(),
        }
        .into());
    }

    let old = &table.columns;
    let new = to_columns(descriptor.schema())?;
    let mut changes = Vec::new();

    for (position, column) in new.iter().cloned().enumerate() {
        match old.iter().position(|c| c.name == column.name) {
            Some(existing) if existing != position => {
                return Err(incompatible(
                    &column.name,
                    Some(old[existing].data_type.as_str()),
                    Some(column.data_type.as_str()),
                    format!("column moved from position {existing} to {position}"),
                ));
            }
            Some(existing) => {
                let current = &old[existing];
                if !same_type(&current.data_type, &column.data_type) {
                    return Err(incompatible(
                        &column.name,
                        Some(current.data_type.as_str()),
                        Some(column.data_type.as_str()),
                        "column type changed".to_string(),
                    ));
                }
                if current.comment != column.comment {
                    changes.push(ColumnChange::UpdateComment {
                        position,
                        comment: column.comment,
                    });
                }
            }
            None if position < old.len() => {
                return Err(incompatible(
                    &column.name,
                    Some(old[position].data_type.as_str()),
                    Some(column.data_type.as_str()),
                    format!(
                        "new column would replace existing column '{}'; columns can only be appended",
                        old[position].name
                    ),
                ));
            }
            None => {
                let evolvable = descriptor
                    .schema()
                    .field(&column.name)
                    .is_some_and(|field| field.is_evolvable());
                if !evolvable {
                    return Err(incompatible(
                        &column.name,
                        None,
                        Some(column.data_type.as_str()),
                        "added columns must be nullable or have a default".to_string(),
                    ));
                }
                changes.push(ColumnChange::Add(column));
            }
        }
    }

    if let Some(dropped) = old.iter().find(|c| !new.iter().any(|n| n.name == c.name)) {
        return Err(incompatible(
            &dropped.name,
            Some(dropped.data_type.as_str()),
            None,
            "column is missing from the new schema; columns cannot be dropped".to_string(),
        ));
    }

    Ok(ColumnDiff { changes })
}

/// Compute the diff and apply it to `table` in place, then store the new
/// schema under `kite.schema.literal`. On error the table is left unchanged.
pub fn compute_and_apply(table: &mut TableRecord, descriptor: &DatasetDescriptor) -> Result<ColumnDiff> {
    let diff = compute_diff(table, descriptor)?;
    for change in diff.changes() {
        debug!(table = %table.qualified_name(), %change, "applying column change");
    }
    diff.apply_to(&mut table.columns);
    table.properties.set(&SCHEMA_LITERAL, descriptor.schema());
    Ok(diff)
}

fn incompatible(
    column: &str,
    old_type: Option<&str>,
    new_type: Option<&str>,
    reason: String,
) -> crate::error::Error {
    EvolutionError::IncompatibleSchemaChange {
        column: column.to_string(),
        old_type: old_type.map(str::to_string),
        new_type: new_type.map(str::to_string),
        reason,
    }
    .into()
}

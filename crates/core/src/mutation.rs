use thiserror::Error;

use crate::dialect::{quote_literal, Dialect};
use crate::results::{column_index, is_null};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("table name cannot be empty")]
    EmptyTableName,
    #[error("table `{0}` has no primary key")]
    NoPrimaryKey(String),
    #[error("column index {index} is out of range for {columns} columns")]
    ColumnOutOfRange { index: usize, columns: usize },
    #[error("none of the primary key columns ({0}) are present in the result")]
    NoKeyColumnsInResult(String),
    #[error("no rows selected")]
    NoRowsSelected,
    #[error("every selected row has a NULL primary key")]
    NoTargetableRows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationScope {
    SingleRow,
    Rows { requested: usize, targeted: usize },
}

impl MutationScope {
    /// Rows the user asked for that the statement cannot reach.
    #[must_use]
    pub fn skipped(self) -> usize {
        match self {
            Self::SingleRow => 0,
            Self::Rows {
                requested,
                targeted,
            } => requested.saturating_sub(targeted),
        }
    }
}

/// Generated statement awaiting confirmation. Never executed by this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationIntent {
    pub sql: String,
    pub kind: MutationKind,
    pub scope: MutationScope,
    pub table: String,
}

impl MutationIntent {
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = match self.kind {
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        };
        match self.scope {
            MutationScope::SingleRow => format!("{verb} 1 row in {}", self.table),
            MutationScope::Rows {
                requested,
                targeted,
            } if requested == targeted => format!("{verb} {targeted} rows in {}", self.table),
            MutationScope::Rows {
                requested,
                targeted,
            } => format!(
                "{verb} {targeted} of {requested} rows in {} ({} with NULL key skipped)",
                self.table,
                requested - targeted
            ),
        }
    }
}

/// The table a result set maps to plus the key columns that identify a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTarget<'a> {
    pub dialect: Dialect,
    pub table: &'a str,
    pub columns: &'a [String],
    pub primary_key: &'a [String],
}

impl<'a> MutationTarget<'a> {
    pub fn new(
        dialect: Dialect,
        table: &'a str,
        columns: &'a [String],
        primary_key: &'a [String],
    ) -> Result<Self, MutationError> {
        if table.trim().is_empty() {
            return Err(MutationError::EmptyTableName);
        }
        if primary_key.is_empty() {
            return Err(MutationError::NoPrimaryKey(table.to_string()));
        }
        Ok(Self {
            dialect,
            table,
            columns,
            primary_key,
        })
    }

    fn qualified_table(&self) -> String {
        self.dialect.catalog().qualify_table_name(self.table)
    }

    /// Key columns paired with their position in the result. Keys the result
    /// does not carry are left out of the WHERE clause.
    fn key_positions(&self) -> Result<Vec<(&'a str, usize)>, MutationError> {
        let positions: Vec<_> = self
            .primary_key
            .iter()
            .filter_map(|key| column_index(self.columns, key).map(|index| (key.as_str(), index)))
            .collect();
        if positions.is_empty() {
            return Err(MutationError::NoKeyColumnsInResult(
                self.primary_key.join(", "),
            ));
        }
        Ok(positions)
    }
}

fn key_predicate(column: &str, value: &str) -> String {
    if is_null(value) {
        format!("{column} IS NULL")
    } else {
        format!("{column} = {}", quote_literal(value))
    }
}

fn row_predicate(keys: &[(&str, usize)], row: &[String]) -> String {
    keys.iter()
        .filter_map(|(column, index)| row.get(*index).map(|value| key_predicate(column, value)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// `None` sets the column to SQL NULL; text is always written as a literal.
pub fn generate_update(
    target: &MutationTarget<'_>,
    row: &[String],
    column_index: usize,
    new_value: Option<&str>,
) -> Result<MutationIntent, MutationError> {
    let column = target
        .columns
        .get(column_index)
        .ok_or(MutationError::ColumnOutOfRange {
            index: column_index,
            columns: target.columns.len(),
        })?;
    let keys = target.key_positions()?;
    let value = new_value.map_or_else(|| "NULL".to_string(), quote_literal);

    Ok(MutationIntent {
        sql: format!(
            "UPDATE {} SET {} = {} WHERE {}",
            target.qualified_table(),
            column,
            value,
            row_predicate(&keys, row)
        ),
        kind: MutationKind::Update,
        scope: MutationScope::SingleRow,
        table: target.table.to_string(),
    })
}

pub fn generate_delete(
    target: &MutationTarget<'_>,
    row: &[String],
) -> Result<MutationIntent, MutationError> {
    let keys = target.key_positions()?;

    Ok(MutationIntent {
        sql: format!(
            "DELETE FROM {} WHERE {}",
            target.qualified_table(),
            row_predicate(&keys, row)
        ),
        kind: MutationKind::Delete,
        scope: MutationScope::SingleRow,
        table: target.table.to_string(),
    })
}

/// Deletes every row in `rows` with one statement. A single-column key uses an
/// `IN` list and skips rows whose key is NULL; composite keys OR together one
/// AND-group per row.
pub fn generate_batch_delete(
    target: &MutationTarget<'_>,
    rows: &[&[String]],
) -> Result<MutationIntent, MutationError> {
    if rows.is_empty() {
        return Err(MutationError::NoRowsSelected);
    }
    let keys = target.key_positions()?;
    let table = target.qualified_table();

    let (sql, targeted) = if let [(column, index)] = keys.as_slice() {
        let values: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get(*index))
            .filter(|value| !is_null(value))
            .map(|value| quote_literal(value))
            .collect();
        if values.is_empty() {
            return Err(MutationError::NoTargetableRows);
        }
        let targeted = values.len();
        (
            format!("DELETE FROM {table} WHERE {column} IN ({})", values.join(",")),
            targeted,
        )
    } else {
        let groups: Vec<String> = rows
            .iter()
            .map(|row| format!("({})", row_predicate(&keys, row)))
            .collect();
        (
            format!("DELETE FROM {table} WHERE {}", groups.join(" OR ")),
            rows.len(),
        )
    };

    Ok(MutationIntent {
        sql,
        kind: MutationKind::Delete,
        scope: MutationScope::Rows {
            requested: rows.len(),
            targeted,
        },
        table: target.table.to_string(),
    })
}

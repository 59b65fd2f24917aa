use crate::query_runner::{QueryBackend, QueryRunner, QueryRunnerError};
use crate::result_filter::Searchable;
use crate::results::QueryResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub default_value: String,
    pub max_length: String,
}

impl Searchable for ColumnInfo {
    fn matches_filter(&self, needle: &str) -> bool {
        self.name.matches_filter(needle)
    }
}

/// A column in another table that points at the current table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkDependency {
    pub table: String,
    pub column: String,
    pub referenced_column: String,
}

fn flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

fn text(row: &[String], index: usize) -> String {
    row.get(index).cloned().unwrap_or_default()
}

fn parse_column_info(result: &QueryResult) -> Vec<ColumnInfo> {
    result
        .rows
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| ColumnInfo {
            name: text(row, 0),
            data_type: text(row, 1),
            nullable: flag(&text(row, 2)),
            primary_key: flag(&text(row, 3)),
            default_value: text(row, 4),
            max_length: text(row, 5),
        })
        .collect()
}

fn parse_dependencies(result: &QueryResult) -> Vec<FkDependency> {
    result
        .rows
        .iter()
        .filter(|row| row.len() >= 3)
        .map(|row| FkDependency {
            table: text(row, 0),
            column: text(row, 1),
            referenced_column: text(row, 2),
        })
        .collect()
}

fn current_database<B: QueryBackend>(runner: &QueryRunner<B>) -> &str {
    runner.database().unwrap_or_default()
}

pub async fn list_databases<B: QueryBackend>(
    runner: &QueryRunner<B>,
) -> Result<Vec<String>, QueryRunnerError> {
    let sql = runner.dialect().catalog().list_databases();
    Ok(runner.execute(&sql).await?.first_column())
}

pub async fn list_tables<B: QueryBackend>(
    runner: &QueryRunner<B>,
) -> Result<Vec<String>, QueryRunnerError> {
    let sql = runner
        .dialect()
        .catalog()
        .list_tables(current_database(runner));
    Ok(runner.execute(&sql).await?.first_column())
}

pub async fn column_info<B: QueryBackend>(
    runner: &QueryRunner<B>,
    table: &str,
) -> Result<Vec<ColumnInfo>, QueryRunnerError> {
    let sql = runner
        .dialect()
        .catalog()
        .column_info_query(current_database(runner), table);
    Ok(parse_column_info(&runner.execute(&sql).await?))
}

/// Primary-key column names in ordinal order. Empty when the table has none.
pub async fn primary_key<B: QueryBackend>(
    runner: &QueryRunner<B>,
    table: &str,
) -> Result<Vec<String>, QueryRunnerError> {
    let sql = runner
        .dialect()
        .catalog()
        .primary_key_query(current_database(runner), table);
    Ok(runner.execute(&sql).await?.first_column())
}

pub async fn referencing_foreign_keys<B: QueryBackend>(
    runner: &QueryRunner<B>,
    table: &str,
) -> Result<Vec<FkDependency>, QueryRunnerError> {
    let sql = runner
        .dialect()
        .catalog()
        .referencing_foreign_keys_query(current_database(runner), table);
    Ok(parse_dependencies(&runner.execute(&sql).await?))
}

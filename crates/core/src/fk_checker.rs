use std::collections::HashSet;

use tracing::warn;

use crate::dialect::{quote_literal, Dialect};
use crate::query_runner::{QueryBackend, QueryRunner, QueryRunnerError};
use crate::results::{column_index, is_null};
use crate::schema::{referencing_foreign_keys, FkDependency};

/// A referencing table together with how many of its rows point at the rows
/// about to be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCount {
    pub dependency: FkDependency,
    pub count: u64,
}

/// Distinct non-NULL values of `column` across `rows`, in first-seen order.
/// Empty when the result does not carry the column.
#[must_use]
pub fn referenced_values(columns: &[String], rows: &[&[String]], column: &str) -> Vec<String> {
    let Some(index) = column_index(columns, column) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(index))
        .filter(|value| !is_null(value))
        .filter(|value| seen.insert(*value))
        .cloned()
        .collect()
}

fn in_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| quote_literal(value))
        .collect::<Vec<_>>()
        .join(",")
}

#[must_use]
pub fn count_references_sql(dialect: Dialect, dependency: &FkDependency, values: &[String]) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {} IN ({})",
        dialect.catalog().qualify_table_name(&dependency.table),
        dependency.column,
        in_list(values)
    )
}

/// Query listing the referencing rows, used to drill into a dependency.
#[must_use]
pub fn dependency_rows_sql(dialect: Dialect, dependency: &FkDependency, values: &[String]) -> String {
    format!(
        "SELECT * FROM {} WHERE {} IN ({})",
        dialect.catalog().qualify_table_name(&dependency.table),
        dependency.column,
        in_list(values)
    )
}

pub async fn find_referencing_tables<B: QueryBackend>(
    runner: &QueryRunner<B>,
    table: &str,
) -> Result<Vec<FkDependency>, QueryRunnerError> {
    referencing_foreign_keys(runner, table).await
}

/// Counts rows in `dependency.table` that reference `values`. Failures and
/// unparsable counts come back as 0 so they never block a delete.
pub async fn count_references<B: QueryBackend>(
    runner: &QueryRunner<B>,
    dependency: &FkDependency,
    values: &[String],
) -> u64 {
    if values.is_empty() {
        return 0;
    }

    let sql = count_references_sql(runner.dialect(), dependency, values);
    match runner.execute(&sql).await {
        Ok(result) => result
            .scalar()
            .and_then(|count| count.trim().parse::<u64>().ok())
            .unwrap_or_else(|| {
                warn!(table = %dependency.table, "dependency count returned no integer");
                0
            }),
        Err(error) => {
            warn!(table = %dependency.table, %error, "dependency count failed");
            0
        }
    }
}

/// Looks up every table referencing `table` and counts the rows tied to
/// `rows`. A failed referrer lookup yields an empty list.
pub async fn check_dependencies<B: QueryBackend>(
    runner: &QueryRunner<B>,
    table: &str,
    columns: &[String],
    rows: &[&[String]],
) -> Vec<DependencyCount> {
    let dependencies = match find_referencing_tables(runner, table).await {
        Ok(dependencies) => dependencies,
        Err(error) => {
            warn!(%table, %error, "foreign key lookup failed");
            return Vec::new();
        }
    };

    let mut counts = Vec::with_capacity(dependencies.len());
    for dependency in dependencies {
        let values = referenced_values(columns, rows, &dependency.referenced_column);
        let count = count_references(runner, &dependency, &values).await;
        counts.push(DependencyCount { dependency, count });
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::{check_dependencies, count_references, count_references_sql, referenced_values};
    use crate::dialect::Dialect;
    use crate::query_runner::QueryRunner;
    use crate::schema::FkDependency;
    use crate::test_support::ScriptedBackend;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn orders_dependency() -> FkDependency {
        FkDependency {
            table: "orders".to_string(),
            column: "user_id".to_string(),
            referenced_column: "id".to_string(),
        }
    }

    #[test]
    fn collects_distinct_non_null_values() {
        let columns = strings(&["id", "name"]);
        let rows = [
            strings(&["1", "a"]),
            strings(&["2", "b"]),
            strings(&["1", "c"]),
            strings(&["NULL", "d"]),
        ];
        let row_refs: Vec<&[String]> = rows.iter().map(Vec::as_slice).collect();

        assert_eq!(referenced_values(&columns, &row_refs, "id"), vec!["1", "2"]);
        assert!(referenced_values(&columns, &row_refs, "missing").is_empty());
    }

    #[test]
    fn builds_count_query_with_qualified_table() {
        let sql = count_references_sql(
            Dialect::SqlServer,
            &FkDependency {
                table: "sales.orders".to_string(),
                column: "customer_id".to_string(),
                referenced_column: "id".to_string(),
            },
            &strings(&["7", "O'Neil"]),
        );

        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM [sales].[orders] WHERE customer_id IN ('7','O''Neil')"
        );
    }

    #[tokio::test]
    async fn empty_value_set_short_circuits_without_querying() {
        let backend = ScriptedBackend::new();
        let runner = QueryRunner::new(backend.clone(), Dialect::MySql);

        assert_eq!(count_references(&runner, &orders_dependency(), &[]).await, 0);
        assert!(backend.executed().is_empty());
    }

    #[tokio::test]
    async fn count_errors_are_swallowed_to_zero() {
        let backend = ScriptedBackend::new();
        backend.fail("COUNT(*)", "permission denied");
        let runner = QueryRunner::new(backend, Dialect::MySql);

        assert_eq!(
            count_references(&runner, &orders_dependency(), &strings(&["1"])).await,
            0
        );
    }

    #[tokio::test]
    async fn counts_rows_referencing_deleted_user() {
        let backend = ScriptedBackend::new();
        backend.respond(
            "REFERENCED_TABLE_NAME",
            &["TABLE_NAME", "COLUMN_NAME", "REFERENCED_COLUMN_NAME"],
            &[&["orders", "user_id", "id"]],
        );
        backend.respond("SELECT COUNT(*) FROM orders", &["COUNT(*)"], &[&["3"]]);
        let runner = QueryRunner::new(backend.clone(), Dialect::MySql);
        let columns = strings(&["id", "name"]);
        let row = strings(&["1", "Alice"]);

        let counts = check_dependencies(&runner, "users", &columns, &[row.as_slice()]).await;

        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].dependency.table, "orders");
        assert_eq!(counts[0].count, 3);
        assert_eq!(
            backend.executed_matching("COUNT(*)"),
            vec!["SELECT COUNT(*) FROM orders WHERE user_id IN ('1')"]
        );
    }

    #[tokio::test]
    async fn failed_referrer_lookup_yields_no_dependencies() {
        let backend = ScriptedBackend::new();
        backend.fail("REFERENCED_TABLE_NAME", "lost connection");
        let runner = QueryRunner::new(backend, Dialect::MySql);
        let columns = strings(&["id"]);
        let row = strings(&["1"]);

        assert!(check_dependencies(&runner, "users", &columns, &[row.as_slice()])
            .await
            .is_empty());
    }
}

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::dialect::Dialect;
use crate::results::QueryResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryBackendError {
    message: String,
}

impl QueryBackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum QueryRunnerError {
    #[error(transparent)]
    Backend(QueryBackendError),
    #[error("{0} connections cannot switch database; reconnect with a different URL")]
    DatabaseSwitchUnsupported(Dialect),
}

/// Blocking-style transport: one statement in, the whole grid out. NULL cells
/// arrive as the [`crate::results::NULL_SENTINEL`] text.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Multi-statement input yields the grid of the last statement that
    /// returned columns. Statements without a result set (UPDATE, DELETE)
    /// yield an empty grid.
    async fn run_query(&self, sql: &str) -> Result<QueryResult, QueryBackendError>;

    /// Makes `database` current for later statements. Transports that scope
    /// the database per pooled connection override this.
    async fn select_database(&self, _database: &str) -> Result<(), QueryBackendError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), QueryBackendError> {
        Ok(())
    }
}

#[async_trait]
impl QueryBackend for Box<dyn QueryBackend> {
    async fn run_query(&self, sql: &str) -> Result<QueryResult, QueryBackendError> {
        self.as_ref().run_query(sql).await
    }

    async fn select_database(&self, database: &str) -> Result<(), QueryBackendError> {
        self.as_ref().select_database(database).await
    }

    async fn close(&self) -> Result<(), QueryBackendError> {
        self.as_ref().close().await
    }
}

#[derive(Debug)]
pub struct QueryRunner<B: QueryBackend> {
    backend: B,
    dialect: Dialect,
    database: Option<String>,
}

impl<B: QueryBackend> QueryRunner<B> {
    #[must_use]
    pub fn new(backend: B, dialect: Dialect) -> Self {
        Self {
            backend,
            dialect,
            database: None,
        }
    }

    #[must_use]
    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database.filter(|name| !name.trim().is_empty());
        self
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Runs `sql` against the current database, prepending the dialect's
    /// database selector when it needs one.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult, QueryRunnerError> {
        let statement = match self.database.as_deref() {
            Some(database) => self
                .dialect
                .catalog()
                .prepend_database_selector(database, sql),
            None => sql.to_string(),
        };
        debug!(dialect = %self.dialect, sql = %statement, "executing statement");

        let result = self
            .backend
            .run_query(&statement)
            .await
            .map_err(QueryRunnerError::Backend)?;
        debug!(
            columns = result.columns.len(),
            rows = result.rows.len(),
            "statement finished"
        );
        Ok(result)
    }

    pub async fn select_database(&mut self, database: &str) -> Result<(), QueryRunnerError> {
        if !self.dialect.supports_database_switch() {
            return Err(QueryRunnerError::DatabaseSwitchUnsupported(self.dialect));
        }
        self.backend
            .select_database(database)
            .await
            .map_err(QueryRunnerError::Backend)?;
        self.database = Some(database.to_string());
        Ok(())
    }

    pub async fn close(&self) -> Result<(), QueryRunnerError> {
        self.backend.close().await.map_err(QueryRunnerError::Backend)
    }
}

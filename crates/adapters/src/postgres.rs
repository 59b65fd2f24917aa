use async_trait::async_trait;
use rowscope_core::config::ConnectionProfile;
use rowscope_core::probe::{BackendError, ConnectionBackend};
use rowscope_core::query_runner::{QueryBackend, QueryBackendError};
use rowscope_core::results::{QueryResult, NULL_SENTINEL};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::warn;

/// A client plus the task driving its socket.
pub struct PostgresConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl PostgresConnection {
    async fn open(profile: &ConnectionProfile) -> Result<Self, tokio_postgres::Error> {
        let (client, connection) = tokio_postgres::connect(&profile.url, NoTls).await?;
        let profile_name = profile.name.clone();
        let driver = tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(profile = %profile_name, %error, "postgres connection closed with error");
            }
        });
        Ok(Self { client, driver })
    }

    fn shutdown(self) {
        drop(self.client);
        self.driver.abort();
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostgresConnectionBackend;

#[async_trait]
impl ConnectionBackend for PostgresConnectionBackend {
    type Connection = PostgresConnection;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Connection, BackendError> {
        PostgresConnection::open(profile)
            .await
            .map_err(|error| BackendError::new(error.to_string()))
    }

    async fn ping(&self, connection: &mut Self::Connection) -> Result<(), BackendError> {
        connection
            .client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|error| BackendError::new(error.to_string()))
    }

    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError> {
        connection.shutdown();
        Ok(())
    }
}

/// Single connection for the whole session. The database is fixed by the URL.
pub struct PostgresDataBackend {
    connection: PostgresConnection,
}

impl PostgresDataBackend {
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self, QueryBackendError> {
        let connection = PostgresConnection::open(profile)
            .await
            .map_err(to_query_error)?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl QueryBackend for PostgresDataBackend {
    async fn run_query(&self, sql: &str) -> Result<QueryResult, QueryBackendError> {
        let messages = self
            .connection
            .client
            .simple_query(sql)
            .await
            .map_err(to_query_error)?;
        Ok(collect_last_result(messages))
    }

    async fn close(&self) -> Result<(), QueryBackendError> {
        self.connection.driver.abort();
        Ok(())
    }
}

/// Folds simple-query messages into the grid `QueryBackend::run_query`
/// promises: the last described result wins.
fn collect_last_result(messages: Vec<SimpleQueryMessage>) -> QueryResult {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut described = false;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(description) => {
                columns = description
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect();
                rows.clear();
                described = true;
            }
            SimpleQueryMessage::Row(row) => {
                if !described {
                    columns = row
                        .columns()
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect();
                    rows.clear();
                    described = true;
                }
                rows.push(
                    (0..row.len())
                        .map(|index| row.get(index).unwrap_or(NULL_SENTINEL).to_string())
                        .collect(),
                );
            }
            SimpleQueryMessage::CommandComplete(_) => {
                described = false;
            }
            _ => {}
        }
    }

    QueryResult::new(columns, rows)
}

fn to_query_error(error: tokio_postgres::Error) -> QueryBackendError {
    match error.as_db_error() {
        Some(db_error) => QueryBackendError::new(format!(
            "{}: {}",
            db_error.code().code(),
            db_error.message()
        )),
        None => QueryBackendError::new(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::collect_last_result;

    #[test]
    fn no_messages_yield_empty_grid() {
        let result = collect_last_result(Vec::new());

        assert!(result.columns.is_empty());
        assert!(result.is_empty());
    }
}

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row, Value};
use rowscope_core::config::ConnectionProfile;
use rowscope_core::dialect::Dialect;
use rowscope_core::probe::{BackendError, ConnectionBackend};
use rowscope_core::query_runner::{QueryBackend, QueryBackendError};
use rowscope_core::results::{QueryResult, NULL_SENTINEL};
use tracing::debug;

use crate::AdapterError;

#[derive(Debug, Clone, Default)]
pub struct MysqlConnectionBackend;

#[async_trait]
impl ConnectionBackend for MysqlConnectionBackend {
    type Connection = Conn;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Connection, BackendError> {
        let opts = opts_from_profile(profile).map_err(|error| BackendError::new(error.to_string()))?;
        Conn::new(opts).await.map_err(to_connection_error)
    }

    async fn ping(&self, connection: &mut Self::Connection) -> Result<(), BackendError> {
        connection.ping().await.map_err(to_connection_error)
    }

    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError> {
        connection.disconnect().await.map_err(to_connection_error)
    }
}

/// Small pool shared by the session. The selected database is replayed with
/// `USE` on every checkout so pooled connections agree on it.
#[derive(Debug, Clone)]
pub struct MysqlDataBackend {
    pool: Pool,
    database: Arc<RwLock<Option<String>>>,
}

impl MysqlDataBackend {
    pub fn from_profile(profile: &ConnectionProfile) -> Result<Self, AdapterError> {
        let constraints = PoolConstraints::new(1, 2).unwrap_or_default();
        let opts = OptsBuilder::from_opts(opts_from_profile(profile)?)
            .pool_opts(PoolOpts::default().with_constraints(constraints));
        Ok(Self {
            pool: Pool::new(opts),
            database: Arc::new(RwLock::new(
                profile.initial_database().map(str::to_string),
            )),
        })
    }

    fn current_database(&self) -> Option<String> {
        self.database
            .read()
            .map(|database| database.clone())
            .unwrap_or_default()
    }

    async fn checkout(&self) -> Result<Conn, QueryBackendError> {
        let mut conn = self.pool.get_conn().await.map_err(to_query_error)?;
        if let Some(database) = self.current_database() {
            use_database(&mut conn, &database).await?;
        }
        Ok(conn)
    }
}

#[async_trait]
impl QueryBackend for MysqlDataBackend {
    async fn run_query(&self, sql: &str) -> Result<QueryResult, QueryBackendError> {
        let mut conn = self.checkout().await?;
        let mut result = conn.query_iter(sql).await.map_err(to_query_error)?;

        let mut grid = QueryResult::empty();
        while !result.is_empty() {
            let columns = result
                .columns_ref()
                .iter()
                .map(|column| column.name_str().into_owned())
                .collect::<Vec<_>>();
            let rows = result
                .collect::<Row>()
                .await
                .map_err(to_query_error)?
                .into_iter()
                .map(row_to_strings)
                .collect::<Vec<_>>();
            if !columns.is_empty() {
                grid = QueryResult::new(columns, rows);
            }
        }

        Ok(grid)
    }

    async fn select_database(&self, database: &str) -> Result<(), QueryBackendError> {
        let mut conn = self.pool.get_conn().await.map_err(to_query_error)?;
        use_database(&mut conn, database).await?;
        if let Ok(mut current) = self.database.write() {
            *current = Some(database.to_string());
        }
        debug!(database, "mysql database selected");
        Ok(())
    }

    async fn close(&self) -> Result<(), QueryBackendError> {
        self.pool.clone().disconnect().await.map_err(to_query_error)
    }
}

async fn use_database(conn: &mut Conn, database: &str) -> Result<(), QueryBackendError> {
    let Some(statement) = Dialect::MySql.catalog().use_database(database) else {
        return Ok(());
    };
    conn.query_drop(statement).await.map_err(to_query_error)
}

fn opts_from_profile(profile: &ConnectionProfile) -> Result<Opts, AdapterError> {
    let opts = Opts::from_url(&profile.url).map_err(|error| AdapterError::InvalidUrl {
        profile: profile.name.clone(),
        message: error.to_string(),
    })?;

    let mut builder = OptsBuilder::from_opts(opts);
    if let Some(database) = profile.initial_database() {
        builder = builder.db_name(Some(database.to_string()));
    }
    Ok(builder.into())
}

fn row_to_strings(row: Row) -> Vec<String> {
    row.unwrap().into_iter().map(mysql_value_to_string).collect()
}

fn mysql_value_to_string(value: Value) -> String {
    match value {
        Value::NULL => NULL_SENTINEL.to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Value::Int(value) => value.to_string(),
        Value::UInt(value) => value.to_string(),
        Value::Float(value) => value.to_string(),
        Value::Double(value) => value.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            if hour == 0 && minute == 0 && second == 0 && micros == 0 {
                format!("{year:04}-{month:02}-{day:02}")
            } else if micros == 0 {
                format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
            } else {
                format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
                )
            }
        }
        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if is_negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(hours);
            if micros == 0 {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}")
            } else {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
            }
        }
    }
}

fn to_connection_error(error: mysql_async::Error) -> BackendError {
    BackendError::new(error.to_string())
}

fn to_query_error(error: mysql_async::Error) -> QueryBackendError {
    QueryBackendError::new(error.to_string())
}

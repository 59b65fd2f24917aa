pub mod mysql;
pub mod postgres;

use rowscope_core::config::ConnectionProfile;
use rowscope_core::dialect::Dialect;
use rowscope_core::probe::{ProbeError, ProbeReport, ReachabilityProbe};
use rowscope_core::query_runner::{QueryBackend, QueryBackendError};
use thiserror::Error;
use tracing::info;

use crate::mysql::{MysqlConnectionBackend, MysqlDataBackend};
use crate::postgres::{PostgresConnectionBackend, PostgresDataBackend};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("connection `{profile}` has an invalid URL: {message}")]
    InvalidUrl { profile: String, message: String },
    #[error("no {0} driver is available; only mysql and postgres connections can be opened")]
    Unsupported(Dialect),
    #[error("failed to open connection: {0}")]
    Open(#[from] QueryBackendError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Opens the transport the session will run its statements over.
pub async fn open_backend(
    profile: &ConnectionProfile,
) -> Result<Box<dyn QueryBackend>, AdapterError> {
    let dialect = profile.dialect();
    info!(profile = %profile.name, %dialect, "opening connection");
    match dialect {
        Dialect::MySql => Ok(Box::new(MysqlDataBackend::from_profile(profile)?)),
        Dialect::Postgres => Ok(Box::new(PostgresDataBackend::connect(profile).await?)),
        Dialect::SqlServer => Err(AdapterError::Unsupported(dialect)),
    }
}

/// Connect-ping-disconnect check used before the session starts.
pub async fn probe(profile: &ConnectionProfile) -> Result<ProbeReport, AdapterError> {
    let report = match profile.dialect() {
        Dialect::MySql => ReachabilityProbe::new(MysqlConnectionBackend).run(profile).await?,
        Dialect::Postgres => {
            ReachabilityProbe::new(PostgresConnectionBackend)
                .run(profile)
                .await?
        }
        dialect @ Dialect::SqlServer => return Err(AdapterError::Unsupported(dialect)),
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use rowscope_core::config::ConnectionProfile;

    use super::{open_backend, probe, AdapterError};

    #[tokio::test]
    async fn sqlserver_has_no_driver() {
        let profile = ConnectionProfile::new("mssql", "sqlserver://sa@127.0.0.1:1433");

        let opened = open_backend(&profile).await;
        let probed = probe(&profile).await;

        assert!(matches!(opened, Err(AdapterError::Unsupported(_))));
        assert!(matches!(probed, Err(AdapterError::Unsupported(_))));
    }

    #[tokio::test]
    async fn malformed_mysql_url_fails_before_connecting() {
        let profile = ConnectionProfile::new("broken", "mysql://root@:notaport/app");

        let opened = open_backend(&profile).await;

        assert!(matches!(opened, Err(AdapterError::InvalidUrl { .. })));
    }
}

use std::fmt;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ConnectionProfile;
use crate::dialect::Dialect;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Opens a throwaway connection for a liveness check.
#[async_trait]
pub trait ConnectionBackend {
    type Connection: Send;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Connection, BackendError>;
    async fn ping(&self, connection: &mut Self::Connection) -> Result<(), BackendError>;
    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub profile_name: String,
    pub dialect: Dialect,
    pub latency: Duration,
    pub checked_at: SystemTime,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not reach `{profile}`: {source}")]
    Connect {
        profile: String,
        #[source]
        source: BackendError,
    },
    #[error("`{profile}` accepted the connection but did not answer: {source}")]
    Ping {
        profile: String,
        #[source]
        source: BackendError,
    },
}

/// What the event loop shows while the probe is outstanding and after it
/// reports back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProbeStatus {
    #[default]
    Pending,
    Reachable(ProbeReport),
    Unreachable(String),
}

impl ProbeStatus {
    #[must_use]
    pub fn from_outcome<E: fmt::Display>(outcome: Result<ProbeReport, E>) -> Self {
        match outcome {
            Ok(report) => Self::Reachable(report),
            Err(error) => Self::Unreachable(error.to_string()),
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug)]
pub struct ReachabilityProbe<B: ConnectionBackend> {
    backend: B,
}

impl<B: ConnectionBackend> ReachabilityProbe<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Connects, pings and disconnects. Latency covers connect plus ping; a
    /// failed disconnect is logged and does not fail the probe.
    pub async fn run(&self, profile: &ConnectionProfile) -> Result<ProbeReport, ProbeError> {
        let started_at = Instant::now();
        let mut handle =
            self.backend
                .connect(profile)
                .await
                .map_err(|source| ProbeError::Connect {
                    profile: profile.name.clone(),
                    source,
                })?;
        let ping = self.backend.ping(&mut handle).await;
        let latency = started_at.elapsed();

        if let Err(error) = self.backend.disconnect(handle).await {
            warn!(profile = %profile.name, %error, "probe disconnect failed");
        }
        ping.map_err(|source| ProbeError::Ping {
            profile: profile.name.clone(),
            source,
        })?;

        debug!(profile = %profile.name, latency_ms = latency.as_millis(), "probe succeeded");
        Ok(ProbeReport {
            profile_name: profile.name.clone(),
            dialect: profile.dialect(),
            latency,
            checked_at: SystemTime::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{
        BackendError, ConnectionBackend, ProbeError, ProbeStatus, ReachabilityProbe,
    };
    use crate::config::ConnectionProfile;
    use crate::dialect::Dialect;

    #[derive(Debug, Default)]
    struct FakeBackend {
        disconnect_calls: AtomicUsize,
        fail_connect: AtomicUsize,
        fail_ping: AtomicUsize,
        ping_calls: AtomicUsize,
    }

    #[derive(Debug)]
    struct FakeConnection;

    #[async_trait::async_trait]
    impl ConnectionBackend for FakeBackend {
        type Connection = FakeConnection;

        async fn connect(
            &self,
            _profile: &ConnectionProfile,
        ) -> Result<Self::Connection, BackendError> {
            if self.fail_connect.load(Ordering::Relaxed) > 0 {
                self.fail_connect.fetch_sub(1, Ordering::Relaxed);
                return Err(BackendError::new("connection refused"));
            }
            Ok(FakeConnection)
        }

        async fn ping(&self, _connection: &mut Self::Connection) -> Result<(), BackendError> {
            self.ping_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_ping.load(Ordering::Relaxed) > 0 {
                self.fail_ping.fetch_sub(1, Ordering::Relaxed);
                return Err(BackendError::new("ping failed"));
            }
            Ok(())
        }

        async fn disconnect(&self, _connection: Self::Connection) -> Result<(), BackendError> {
            self.disconnect_calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn sample_profile() -> ConnectionProfile {
        ConnectionProfile::new("local", "postgres://app@127.0.0.1/app")
    }

    #[tokio::test]
    async fn successful_probe_reports_latency_and_disconnects() {
        let probe = ReachabilityProbe::new(FakeBackend::default());

        let report = probe
            .run(&sample_profile())
            .await
            .expect("probe should succeed");

        assert_eq!(report.profile_name, "local");
        assert_eq!(report.dialect, Dialect::Postgres);
        assert_eq!(probe.backend.ping_calls.load(Ordering::Relaxed), 1);
        assert_eq!(probe.backend.disconnect_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn connect_failure_is_reported_without_disconnect() {
        let probe = ReachabilityProbe::new(FakeBackend {
            fail_connect: AtomicUsize::new(1),
            ..FakeBackend::default()
        });

        let error = probe
            .run(&sample_profile())
            .await
            .expect_err("probe should fail");

        assert!(matches!(error, ProbeError::Connect { .. }));
        assert_eq!(error.to_string(), "could not reach `local`: connection refused");
        assert_eq!(probe.backend.disconnect_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn ping_failure_still_closes_connection() {
        let probe = ReachabilityProbe::new(FakeBackend {
            fail_ping: AtomicUsize::new(1),
            ..FakeBackend::default()
        });

        let error = probe
            .run(&sample_profile())
            .await
            .expect_err("probe should fail");

        assert!(matches!(error, ProbeError::Ping { .. }));
        assert_eq!(probe.backend.disconnect_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn status_settles_from_outcome() {
        assert!(!ProbeStatus::default().is_settled());

        let probe = ReachabilityProbe::new(FakeBackend {
            fail_connect: AtomicUsize::new(1),
            ..FakeBackend::default()
        });
        let status = ProbeStatus::from_outcome(probe.run(&sample_profile()).await);

        assert!(status.is_settled());
        assert!(matches!(status, ProbeStatus::Unreachable(message) if message.contains("refused")));
    }
}

pub mod config;
pub mod dialect;
pub mod fk_checker;
pub mod mutation;
pub mod probe;
pub mod query_runner;
pub mod query_target;
pub mod result_filter;
pub mod results;
pub mod schema;
pub mod session;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, ConnectionProfile};
pub use dialect::Dialect;
pub use query_runner::{QueryBackend, QueryBackendError};
pub use results::{QueryResult, NULL_SENTINEL};
pub use session::{Screen, Session, SessionError, SessionState};

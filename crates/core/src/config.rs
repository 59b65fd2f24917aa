use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialect::Dialect;

const APP_DIR: &str = "rowscope";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "rowscope.log";
pub const DEFAULT_LOG_LEVEL: &str = "rowscope=info";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub dialect: Option<Dialect>,
    #[serde(default)]
    pub database: Option<String>,
}

impl ConnectionProfile {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            dialect: None,
            database: None,
        }
    }

    /// Explicit dialect if configured, otherwise detected from the URL.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect.unwrap_or_else(|| Dialect::detect(&self.url))
    }

    #[must_use]
    pub fn initial_database(&self) -> Option<&str> {
        self.database
            .as_deref()
            .filter(|database| !database.trim().is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    log_file: Option<PathBuf>,
    #[serde(default)]
    connections: Vec<ConnectionProfile>,
}

impl ConfigDocument {
    fn normalize(&mut self) {
        let mut by_name = std::collections::BTreeMap::new();
        for connection in self.connections.drain(..) {
            by_name.insert(connection.name.clone(), connection);
        }
        self.connections = by_name.into_values().collect();
    }
}

/// Read-only application settings. Saving connections is left to editing the
/// file by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    path: PathBuf,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    connections: Vec<ConnectionProfile>,
}

impl AppConfig {
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_path(default_config_path()?)
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let empty = |path: PathBuf| Self {
            path,
            log_level: None,
            log_file: None,
            connections: Vec::new(),
        };
        if !path.exists() {
            return Ok(empty(path));
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(empty(path));
        }

        let mut doc: ConfigDocument =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        doc.normalize();

        Ok(Self {
            path,
            log_level: doc.log_level,
            log_file: doc.log_file,
            connections: doc.connections,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Configured log file, or `rowscope.log` next to the config file.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            self.path
                .parent()
                .map_or_else(|| PathBuf::from(LOG_FILE), |dir| dir.join(LOG_FILE))
        })
    }

    #[must_use]
    pub fn connections(&self) -> &[ConnectionProfile] {
        &self.connections
    }

    #[must_use]
    pub fn connection(&self, name: &str) -> Option<&ConnectionProfile> {
        self.connections
            .iter()
            .find(|connection| connection.name == name)
    }
}

pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(custom) = env::var_os("ROWSCOPE_CONFIG_DIR") {
        return Ok(PathBuf::from(custom));
    }

    let base_dir = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join(APP_DIR))
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_config_dir()?.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConnectionProfile, DEFAULT_LOG_LEVEL};
    use crate::dialect::Dialect;

    fn write_config(temp_dir: &TempDir, contents: &str) -> PathBuf {
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, contents).expect("failed to write config");
        path
    }

    #[test]
    fn missing_config_file_loads_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");

        let config = AppConfig::load_from_path(&path).expect("failed to load config");

        assert!(config.connections().is_empty());
        assert_eq!(config.log_level(), DEFAULT_LOG_LEVEL);
        assert_eq!(config.log_file(), temp_dir.path().join("rowscope.log"));
    }

    #[test]
    fn loads_connections_sorted_with_last_duplicate_winning() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = write_config(
            &temp_dir,
            r#"
log_level = "rowscope=debug"
log_file = "/tmp/rowscope-test.log"

[[connections]]
name = "warehouse"
url = "postgres://reader@db/warehouse"

[[connections]]
name = "local"
url = "mysql://root@127.0.0.1/app"

[[connections]]
name = "local"
url = "sqlserver://sa@127.0.0.1:1433"
database = "sales"
"#,
        );

        let config = AppConfig::load_from_path(&path).expect("failed to load config");

        let names: Vec<_> = config
            .connections()
            .iter()
            .map(|connection| connection.name.as_str())
            .collect();
        assert_eq!(names, vec!["local", "warehouse"]);

        let local = config.connection("local").expect("local connection");
        assert_eq!(local.dialect(), Dialect::SqlServer);
        assert_eq!(local.initial_database(), Some("sales"));
        assert_eq!(config.log_level(), "rowscope=debug");
        assert_eq!(config.log_file(), PathBuf::from("/tmp/rowscope-test.log"));
    }

    #[test]
    fn explicit_dialect_overrides_url_detection() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = write_config(
            &temp_dir,
            r#"
[[connections]]
name = "proxy"
url = "tcp://10.0.0.5:6543/app"
dialect = "postgres"
database = ""
"#,
        );

        let config = AppConfig::load_from_path(&path).expect("failed to load config");
        let proxy = config.connection("proxy").expect("proxy connection");

        assert_eq!(proxy.dialect(), Dialect::Postgres);
        assert_eq!(proxy.initial_database(), None);
        assert_eq!(
            ConnectionProfile::new("x", "tcp://host").dialect(),
            Dialect::MySql
        );
    }

    #[test]
    fn malformed_config_reports_parse_error() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = write_config(&temp_dir, "[[connections]]\nname = 42\n");

        let error = AppConfig::load_from_path(&path).expect_err("config should not parse");

        assert!(matches!(error, ConfigError::Parse { .. }));
    }
}

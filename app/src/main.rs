use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use rowscope_core::config::{AppConfig, ConnectionProfile};
use tracing::info;
use tracing_subscriber::EnvFilter;

const AD_HOC_PROFILE: &str = "ad-hoc";

#[derive(Debug, Parser)]
#[command(name = "rowscope", version, about = "Browse, filter and edit database rows from the terminal")]
struct Cli {
    /// Config file to read instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Saved connection to open.
    #[arg(long, conflicts_with = "url")]
    connection: Option<String>,
    /// Connection URL, bypassing saved connections.
    #[arg(long)]
    url: Option<String>,
    /// Database to start in.
    #[arg(long)]
    database: Option<String>,
}

fn load_config(cli: &Cli) -> Result<AppConfig, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_default()?,
    };
    Ok(config)
}

/// Logs go to a file; the terminal belongs to the explorer.
fn init_logging(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_level())?,
    };

    let log_file = config.log_file();
    if let Some(parent) = log_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| error as Box<dyn Error>)?;
    Ok(())
}

fn resolve_profile(cli: &Cli, config: &AppConfig) -> Result<ConnectionProfile, Box<dyn Error>> {
    let mut profile = if let Some(url) = &cli.url {
        ConnectionProfile::new(AD_HOC_PROFILE, url.clone())
    } else if let Some(name) = &cli.connection {
        config.connection(name).cloned().ok_or_else(|| {
            format!(
                "no connection named `{name}` in {}",
                config.path().display()
            )
        })?
    } else {
        config.connections().first().cloned().ok_or_else(|| {
            format!(
                "no connections configured; pass --url or add [[connections]] to {}",
                config.path().display()
            )
        })?
    };

    if let Some(database) = &cli.database {
        profile.database = Some(database.clone());
    }
    Ok(profile)
}

fn run_app(
    cli: &Cli,
    config: &AppConfig,
    run_tui: impl FnOnce(ConnectionProfile) -> Result<(), rowscope_tui::TuiError>,
) -> Result<(), Box<dyn Error>> {
    let profile = resolve_profile(cli, config)?;
    info!(profile = %profile.name, dialect = %profile.dialect(), "starting explorer");
    run_tui(profile)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config)?;
    run_app(&cli, &config, rowscope_tui::run)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use clap::Parser;
    use rowscope_core::config::AppConfig;
    use rowscope_core::dialect::Dialect;
    use tempfile::TempDir;

    use super::{init_logging, load_config, resolve_profile, run_app, Cli};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rowscope").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    fn config_with_connections(temp_dir: &TempDir) -> AppConfig {
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[[connections]]
name = "warehouse"
url = "postgres://reader@db/warehouse"

[[connections]]
name = "app"
url = "mysql://root@127.0.0.1/app"
"#,
        )
        .expect("failed to write config");
        AppConfig::load_from_path(path).expect("failed to load config")
    }

    #[test]
    fn url_flag_builds_ad_hoc_profile() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let cli = parse(&["--url", "sqlserver://sa@db:1433", "--database", "sales"]);

        let profile =
            resolve_profile(&cli, &config_with_connections(&temp_dir)).expect("profile");

        assert_eq!(profile.name, "ad-hoc");
        assert_eq!(profile.dialect(), Dialect::SqlServer);
        assert_eq!(profile.initial_database(), Some("sales"));
    }

    #[test]
    fn named_connection_is_looked_up_and_first_is_default() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let config = config_with_connections(&temp_dir);

        let named = resolve_profile(&parse(&["--connection", "warehouse"]), &config)
            .expect("named profile");
        let default = resolve_profile(&parse(&[]), &config).expect("default profile");

        assert_eq!(named.dialect(), Dialect::Postgres);
        assert_eq!(default.name, "app");
    }

    #[test]
    fn unknown_connection_and_empty_config_are_errors() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let config = config_with_connections(&temp_dir);
        let empty = load_config(&parse(&[
            "--config",
            temp_dir.path().join("missing.toml").to_str().expect("utf-8 path"),
        ]))
        .expect("missing config loads empty");

        let unknown = resolve_profile(&parse(&["--connection", "nope"]), &config)
            .expect_err("unknown connection");
        let none = resolve_profile(&parse(&[]), &empty).expect_err("no connections");

        assert!(unknown.to_string().contains("`nope`"));
        assert!(none.to_string().contains("--url"));
    }

    #[test]
    fn logging_writes_to_configured_file_in_new_directory() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let log_file = temp_dir.path().join("logs").join("rowscope.log");
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            format!("log_level = \"debug\"\nlog_file = {:?}\n", log_file.display().to_string()),
        )
        .expect("failed to write config");
        let config = AppConfig::load_from_path(path).expect("failed to load config");

        init_logging(&config).expect("logging should initialize");

        assert!(log_file.exists());
    }

    #[test]
    fn connection_and_url_flags_conflict() {
        let result = Cli::try_parse_from(["rowscope", "--connection", "a", "--url", "mysql://x"]);

        assert!(result.is_err());
    }

    #[test]
    fn run_app_hands_profile_to_tui_runner() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let config = config_with_connections(&temp_dir);
        let mut seen = None;

        let result = run_app(&parse(&["--connection", "warehouse"]), &config, |profile| {
            seen = Some(profile.name);
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(seen.as_deref(), Some("warehouse"));
    }

    #[test]
    fn run_app_propagates_tui_errors() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let config = config_with_connections(&temp_dir);

        let result = run_app(&parse(&[]), &config, |_| {
            Err(rowscope_tui::TuiError::Io(io::Error::other("boom")))
        });

        assert!(result.is_err());
    }
}

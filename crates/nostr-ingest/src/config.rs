//! Relay configuration loading from file and environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use nostr_ingest_store::{Driver, StoreConfig};

use crate::info::InfoConfig;
use crate::notify::NotifyConfig;
use crate::policy::Limits;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Admin listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend.
    #[serde(default)]
    pub database: StoreConfig,

    /// Acceptance limits.
    #[serde(default)]
    pub limits: Limits,

    /// Report notifications.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Relay information document.
    #[serde(default)]
    pub info: InfoConfig,
}

/// Network configuration for the admin HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "nostr_ingest=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    7447
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A storage driver this build does not provide.
    #[error("unsupported database driver: {0}")]
    UnsupportedDriver(String),

    /// An environment override that does not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `NOSTR_INGEST_HOST` overrides `server.host`
/// - `NOSTR_INGEST_PORT` overrides `server.port`
/// - `DATABASE_DRIVER` overrides `database.driver`
/// - `DATABASE_URL` overrides `database.path`
/// - `PUSHOVER_TOKEN` / `PUSHOVER_USER` override the notify credentials
/// - `NOSTR_INGEST_LOG_LEVEL` overrides `logging.level`
/// - `NOSTR_INGEST_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if an override does not parse.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply environment-style overrides read through `var`.
pub fn apply_overrides(
    mut config: Config,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
        value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value })
    }

    if let Some(host) = var("NOSTR_INGEST_HOST") {
        config.server.host = parse("NOSTR_INGEST_HOST", host)?;
    }
    if let Some(port) = var("NOSTR_INGEST_PORT") {
        config.server.port = parse("NOSTR_INGEST_PORT", port)?;
    }
    if let Some(driver) = var("DATABASE_DRIVER") {
        config.database.driver = driver
            .parse::<Driver>()
            .map_err(|_| ConfigError::UnsupportedDriver(driver))?;
    }
    if let Some(url) = var("DATABASE_URL") {
        config.database.path = PathBuf::from(url);
    }
    if let Some(token) = var("PUSHOVER_TOKEN") {
        config.notify.pushover_token = Some(token);
    }
    if let Some(user) = var("PUSHOVER_USER") {
        config.notify.pushover_user = Some(user);
    }
    if let Some(level) = var("NOSTR_INGEST_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("NOSTR_INGEST_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}

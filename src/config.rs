//! Configuration loading from TOML files and environment variables.
//!
//! The config file lives at `~/.tempo/config.toml` by default. Every section has
//! serde defaults, so a missing file or a partial file both work. Environment
//! variables (`TEMPO_DB`, `TEMPO_BACKEND`, `TEMPO_LOG_LEVEL`) override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TempoConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub csv: CsvConfig,
    pub sqlite: SqliteConfig,
    pub postgres: PostgresConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub socket_path: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub driver: Driver,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CsvConfig {
    pub output: String,
    pub delimiter: String,
    pub quoting: CsvQuoting,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SqliteConfig {
    pub database: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// The byte-level channel carrying one JSON request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// One newline-terminated exchange per connection.
    Tcp,
    /// Same framing as TCP, over a filesystem socket path.
    Unix,
    /// One JSON document per text frame, many exchanges per session.
    Websocket,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Unix => "unix",
            Self::Websocket => "websocket",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage backend driver, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Stdout,
    Csv,
    Log,
    Sqlite,
    Postgres,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Csv => "csv",
            Self::Log => "log",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Self::Stdout),
            "csv" => Ok(Self::Csv),
            "log" => Ok(Self::Log),
            "sqlite" => Ok(Self::Sqlite),
            "postgres" => Ok(Self::Postgres),
            _ => Err(format!("unknown backend driver: {s}")),
        }
    }
}

/// CSV field quoting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvQuoting {
    /// Quote every field regardless of content.
    All,
    /// Quote only fields containing the delimiter, quote, or line breaks.
    Minimal,
    /// Quote all non-numeric fields.
    Nonnumeric,
    /// Never quote; escape delimiters instead.
    None,
}

impl CsvQuoting {
    pub fn quote_style(&self) -> csv::QuoteStyle {
        match self {
            Self::All => csv::QuoteStyle::Always,
            Self::Minimal => csv::QuoteStyle::Necessary,
            Self::Nonnumeric => csv::QuoteStyle::NonNumeric,
            Self::None => csv::QuoteStyle::Never,
        }
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            csv: CsvConfig::default(),
            sqlite: SqliteConfig::default(),
            postgres: PostgresConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            host: "127.0.0.1".into(),
            port: 4242,
            socket_path: "/tmp/tempo.sock".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Sqlite,
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            output: "tempo_worklog.csv".into(),
            delimiter: ";".into(),
            quoting: CsvQuoting::All,
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        let database = default_tempo_dir()
            .join("tempo.sqlite")
            .to_string_lossy()
            .into_owned();
        Self { database }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            username: "postgres".into(),
            password: String::new(),
            database: "worklogs".into(),
        }
    }
}

/// Returns `~/.tempo/`
pub fn default_tempo_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".tempo")
}

/// Returns the default config file path: `~/.tempo/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tempo_dir().join("config.toml")
}

impl TempoConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TempoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (TEMPO_DB, TEMPO_BACKEND, TEMPO_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TEMPO_DB") {
            self.sqlite.database = val;
        }
        if let Ok(val) = std::env::var("TEMPO_BACKEND") {
            match val.parse() {
                Ok(driver) => self.backend.driver = driver,
                Err(e) => warn!("ignoring TEMPO_BACKEND: {e}"),
            }
        }
        if let Ok(val) = std::env::var("TEMPO_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the SQLite database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.sqlite.database)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

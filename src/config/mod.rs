//! Configuration module for the civic ledger.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Where the initial report feed comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    /// Built-in demo reports; nothing is persisted.
    Fixtures,
    /// Reports persisted in the SQLite database at `db_path`.
    Sqlite,
}

impl DataSourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixtures" => Some(DataSourceKind::Fixtures),
            "sqlite" => Some(DataSourceKind::Sqlite),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to the JSON file holding the anonymous identity; `None` keeps it
    /// in memory only
    pub identity_path: Option<PathBuf>,
    /// Origin of the report feed
    pub data_source: DataSourceKind,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("CIVIC_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("CIVIC_DB_PATH")
            .unwrap_or_else(|_| "./data/civic.sqlite".to_string())
            .into();

        let identity_path = match env::var("CIVIC_IDENTITY_PATH") {
            Ok(path) if path.eq_ignore_ascii_case("memory") => None,
            Ok(path) => Some(path.into()),
            Err(_) => Some("./data/identity.json".into()),
        };

        let data_source_raw =
            env::var("CIVIC_DATA_SOURCE").unwrap_or_else(|_| "fixtures".to_string());
        let data_source = DataSourceKind::parse(&data_source_raw)
            .ok_or_else(|| format!("Invalid CIVIC_DATA_SOURCE '{}'", data_source_raw))?;

        let bind_addr_raw =
            env::var("CIVIC_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|e| format!("Invalid CIVIC_BIND_ADDR '{}': {}", bind_addr_raw, e))?;

        let log_level = env::var("CIVIC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_psk,
            db_path,
            identity_path,
            data_source,
            bind_addr,
            log_level,
        })
    }
}

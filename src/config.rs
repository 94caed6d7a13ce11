//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::service::restore_service::DEFAULT_RETAINED_RESTORES;

/// Top-level service configuration.
///
/// Loaded once at startup via [`TimeMachineConfig::from_env`].
#[derive(Debug, Clone)]
pub struct TimeMachineConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Directory holding dump files. Created at startup if absent.
    pub backup_dir: PathBuf,

    /// Explicit `pg_dump` binary; discovered on `PATH` when unset.
    pub pg_dump_path: Option<PathBuf>,

    /// Explicit `psql` binary; discovered on `PATH` when unset.
    pub psql_path: Option<PathBuf>,

    /// Maximum connections per cached pool.
    pub database_max_connections: u32,

    /// Timeout in seconds for opening a database connection.
    pub database_connect_timeout_secs: u64,

    /// Origins allowed by the CORS layer.
    pub cors_allowed_origins: Vec<String>,

    /// Restore jobs kept for lookup before finished ones are evicted.
    pub retained_restores: usize,
}

impl Default for TimeMachineConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            backup_dir: PathBuf::from("./backups"),
            pg_dump_path: None,
            psql_path: None,
            database_max_connections: 5,
            database_connect_timeout_secs: 5,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
            retained_restores: DEFAULT_RETAINED_RESTORES,
        }
    }
}

impl TimeMachineConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to [`TimeMachineConfig::default`] values when a variable
    /// is not set. Calls `dotenvy::dotenv().ok()` to optionally load a
    /// `.env` file. `PORT` is honoured when `LISTEN_ADDR` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("LISTEN_ADDR") {
            Ok(addr) => addr.parse()?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], parse_env("PORT", 8080))),
        };

        let backup_dir = std::env::var("BACKUP_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map_or(defaults.backup_dir, PathBuf::from);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|v| split_list(&v))
            .unwrap_or(defaults.cors_allowed_origins);

        Ok(Self {
            listen_addr,
            backup_dir,
            pg_dump_path: parse_env_path("PG_DUMP_PATH"),
            psql_path: parse_env_path("PSQL_PATH"),
            database_max_connections: parse_env(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_connect_timeout_secs: parse_env(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.database_connect_timeout_secs,
            ),
            cors_allowed_origins,
            retained_restores: parse_env("RETAINED_RESTORES", defaults.retained_restores),
        })
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.database_connect_timeout_secs)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads an environment variable as a path, treating empty as unset.
fn parse_env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Splits a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

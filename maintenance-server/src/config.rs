use std::env::var;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

/// Where the config and whitelist documents live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// `config.yml` and `WhitelistedPlayers.yml` under the data directory
    File,
    /// Two key/value tables in one SQLite database
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "yaml" => Ok(StorageKind::File),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 65536 = 64KB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 10)
    pub request_timeout: Duration,

    /// Server port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Directory holding the YAML documents
    /// Env: DATA_DIR (default: "maintenance")
    pub data_dir: PathBuf,

    /// Storage backend for both documents
    /// Env: STORAGE_BACKEND (default: "file", or "sqlite")
    pub storage: StorageKind,

    /// Database file path, used by the sqlite backend
    /// Env: DATABASE_PATH (default: "maintenance.db")
    pub database_path: String,

    /// Bearer token for the admin routes
    /// Env: ADMIN_TOKEN (optional, admin routes are open when unset)
    pub admin_token: Option<String>,

    /// Player slots reported in status and ping messages
    /// Env: MAX_PLAYERS (default: 20)
    pub max_players: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        let defaults = Self::default();
        Self {
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", defaults.request_body_limit),
            request_timeout: Duration::from_secs(env_or_default(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            port: env_or_default("PORT", defaults.port),
            data_dir: env_or_default("DATA_DIR", defaults.data_dir),
            storage: env_or_default("STORAGE_BACKEND", defaults.storage),
            database_path: env_or_default_string("DATABASE_PATH", &defaults.database_path),
            admin_token: var("ADMIN_TOKEN").ok().filter(|token| !token.is_empty()),
            max_players: env_or_default("MAX_PLAYERS", defaults.max_players),
        }
    }
}

impl Default for Config {
    /// Create configuration with all default values
    fn default() -> Self {
        Self {
            request_body_limit: 64 * 1024, // 64 KB
            request_timeout: Duration::from_secs(10),
            port: 3000,
            data_dir: PathBuf::from("maintenance"),
            storage: StorageKind::File,
            database_path: "maintenance.db".to_string(),
            admin_token: None,
            max_players: 20,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

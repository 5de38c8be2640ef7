//! Server configuration
//!
//! Loaded from a JSON file; every field has a default:
//!
//! ```json
//! {
//!   "log_path": "./data/transactions.log",
//!   "queue_capacity": 16,
//!   "sync_mode": "fsync",
//!   "http": { "host": "0.0.0.0", "port": 8080, "cors_origins": [] }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;
use crate::txlog::{LoggerOptions, SyncMode, DEFAULT_QUEUE_CAPACITY};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Transaction log file; parent directories are created on open
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Writer queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// "fsync" (default) or "none"
    #[serde(default)]
    pub sync_mode: SyncMode,

    #[serde(default)]
    pub http: HttpServerConfig,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("./data/transactions.log")
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            queue_capacity: default_queue_capacity(),
            sync_mode: SyncMode::default(),
            http: HttpServerConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.log_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("log_path must not be empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0".into()));
        }
        Ok(())
    }

    /// Options for the transaction logger
    pub fn logger_options(&self) -> LoggerOptions {
        LoggerOptions {
            queue_capacity: self.queue_capacity,
            sync_mode: self.sync_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.sync_mode, SyncMode::Fsync);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(
            r#"{
                "log_path": "/var/lib/kv/tx.log",
                "queue_capacity": 64,
                "sync_mode": "none",
                "http": { "host": "127.0.0.1", "port": 9000, "cors_origins": ["http://a"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.log_path, PathBuf::from("/var/lib/kv/tx.log"));
        assert_eq!(config.logger_options().queue_capacity, 64);
        assert_eq!(config.logger_options().sync_mode, SyncMode::None);
        assert_eq!(config.http.socket_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = Config::from_json(r#"{"queue_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_sync_mode() {
        let err = Config::from_json(r#"{"sync_mode": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_empty_log_path() {
        assert!(Config::from_json(r#"{"log_path": ""}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/kvstore.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

//! CLI command implementations
//!
//! `serve` boots in strict order:
//! 1. Configuration load
//! 2. Transaction log open
//! 3. Replay into a fresh Store (any error aborts)
//! 4. Writer start
//! 5. HTTP activation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::http_server::HttpServer;
use crate::observability::Logger;
use crate::recovery::recover;
use crate::service::KvService;
use crate::store::Store;
use crate::txlog::{FileTransactionLogger, LoggerOptions};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the matching command.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::Verify { config, log } => verify(config.as_deref(), log),
    }
}

/// Defaults when no file is given
pub fn load_config(path: Option<&Path>) -> CliResult<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

/// Replay the log, then serve HTTP until Ctrl-C.
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
    }

    let runtime = Runtime::new()
        .map_err(|e| CliError::io_error(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async move {
        let (service, _stats) = KvService::open(&config).await?;
        let service = Arc::new(service);

        let server = HttpServer::with_config(Arc::clone(&service), config.http.clone());
        let served = server.start().await;

        // Flush whatever is still queued before exiting
        if let Err(e) = service.close().await {
            Logger::error(
                "SHUTDOWN_FLUSH_FAILED",
                &[("code", e.code()), ("error", &e.to_string())],
            );
        }

        served.map_err(|e| CliError::io_error(format!("HTTP server error: {}", e)))
    })
}

/// Result of replaying a log without serving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifySummary {
    pub log_path: String,
    pub events: u64,
    pub puts: u64,
    pub deletes: u64,
    pub last_sequence: u64,
    /// Keys present after replay
    pub keys: usize,
}

/// Replay `log_path` into a scratch Store. The writer is never started and
/// a missing file is an error, so the disk is left untouched.
pub async fn verify_log(log_path: &Path, options: LoggerOptions) -> CliResult<VerifySummary> {
    if !log_path.is_file() {
        return Err(CliError::io_error(format!(
            "transaction log not found: {}",
            log_path.display()
        )));
    }

    let logger = FileTransactionLogger::open(log_path, options)
        .map_err(|e| CliError::io_error(format!("{} ({})", e, e.code())))?;

    let mut store = Store::new();
    let stats = recover(&logger, &mut store).await?;

    Ok(VerifySummary {
        log_path: log_path.display().to_string(),
        events: stats.events_replayed,
        puts: stats.puts,
        deletes: stats.deletes,
        last_sequence: logger.last_sequence(),
        keys: store.len(),
    })
}

/// Print a JSON summary of the log, or a JSON error and fail.
pub fn verify(config_path: Option<&Path>, log: Option<PathBuf>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let log_path = log.unwrap_or_else(|| config.log_path.clone());

    let runtime = Runtime::new()
        .map_err(|e| CliError::io_error(format!("Failed to create runtime: {}", e)))?;

    match runtime.block_on(verify_log(&log_path, config.logger_options())) {
        Ok(summary) => write_response(serde_json::to_value(&summary)?),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_verify_clean_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tx.log");
        fs::write(&path, "1\t2\tx\t1\n2\t2\ty\t2\n3\t1\tx\t\n").unwrap();

        let summary = verify_log(&path, LoggerOptions::default()).await.unwrap();
        assert_eq!(summary.events, 3);
        assert_eq!(summary.puts, 2);
        assert_eq!(summary.deletes, 1);
        assert_eq!(summary.last_sequence, 3);
        assert_eq!(summary.keys, 1);
    }

    #[tokio::test]
    async fn test_verify_leaves_log_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tx.log");
        let content = "5\t2\ta\t1\n9\t2\tb\t2\n";
        fs::write(&path, content).unwrap();

        verify_log(&path, LoggerOptions::default()).await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[tokio::test]
    async fn test_verify_reports_sequence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tx.log");
        fs::write(&path, "1\t2\ta\t1\n1\t2\tb\t2\n").unwrap();

        let err = verify_log(&path, LoggerOptions::default()).await.unwrap_err();
        assert_eq!(err.code_str(), "KV_CLI_REPLAY_FAILED");
        assert!(err.message().contains("KV_TXLOG_SEQUENCE"));
    }

    #[tokio::test]
    async fn test_verify_missing_log_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("typo").join("tx.log");

        let err = verify_log(&path, LoggerOptions::default()).await.unwrap_err();
        assert_eq!(err.code_str(), "KV_CLI_IO_ERROR");
        assert!(err.message().contains("not found"));
        assert!(!path.exists());
        assert!(!dir.path().join("typo").exists());
    }

    #[test]
    fn test_load_config_defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kvstore.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert_eq!(err.code_str(), "KV_CLI_CONFIG_ERROR");
    }
}

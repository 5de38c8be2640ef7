//! CLI error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::recovery::RecoveryError;
use crate::service::ServiceError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing or invalid
    ConfigError,
    /// stdout, runtime or socket failure
    IoError,
    /// Log replay failed; the message carries the log's own code
    ReplayFailed,
    /// Startup failed after a successful replay
    BootFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "KV_CLI_CONFIG_ERROR",
            Self::IoError => "KV_CLI_IO_ERROR",
            Self::ReplayFailed => "KV_CLI_REPLAY_FAILED",
            Self::BootFailed => "KV_CLI_BOOT_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn replay_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ReplayFailed, msg)
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<RecoveryError> for CliError {
    fn from(e: RecoveryError) -> Self {
        Self::replay_failed(format!("{} ({})", e, e.code()))
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Recovery(e) => e.into(),
            other => Self::boot_failed(format!("{} ({})", other, other.code())),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txlog::TxLogError;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::config_error("queue_capacity must be > 0");
        assert_eq!(
            err.to_string(),
            "KV_CLI_CONFIG_ERROR: queue_capacity must be > 0"
        );
    }

    #[test]
    fn test_replay_error_keeps_log_code() {
        let err: CliError = ServiceError::Recovery(RecoveryError::Replay {
            applied: 3,
            source: TxLogError::parse(4, "empty key"),
        })
        .into();

        assert_eq!(err.code(), &CliErrorCode::ReplayFailed);
        assert!(err.message().contains("KV_TXLOG_PARSE"));
    }

    #[test]
    fn test_other_service_errors_are_boot_failures() {
        let err: CliError = ServiceError::Log(TxLogError::AlreadyRunning).into();
        assert_eq!(err.code_str(), "KV_CLI_BOOT_FAILED");
    }
}

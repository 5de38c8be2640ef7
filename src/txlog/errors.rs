//! Transaction log error types
//!
//! Error codes:
//! - KV_TXLOG_PARSE (FATAL): malformed record found during replay
//! - KV_TXLOG_SEQUENCE (FATAL): non-increasing sequence number during replay
//! - KV_TXLOG_IO (FATAL): open, read, write or fsync failure
//! - KV_TXLOG_* usage codes (ERROR): the logger was driven out of order

use std::fmt;
use std::io;

use thiserror::Error;

/// Severity levels for transaction log errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call fails, the logger keeps its state
    Error,
    /// The log (or the replay) cannot continue
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Transaction log errors
#[derive(Debug, Error)]
pub enum TxLogError {
    /// A record could not be decoded
    #[error("input parse error at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    /// A record's sequence number did not advance past the previous one
    #[error("transaction number out of sequence at line {line}: got {sequence}, last was {last}")]
    Sequence { line: u64, sequence: u64, last: u64 },

    /// Disk failure while opening, reading or appending
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// `write_*` called before `run()`
    #[error("transaction logger is not running")]
    NotRunning,

    /// `run()` called twice
    #[error("transaction logger is already running")]
    AlreadyRunning,

    /// `read_events()` called a second time on the same instance
    #[error("transaction log has already been replayed")]
    AlreadyReplayed,

    /// `run()` called while a replay stream is still being produced
    #[error("replay still in progress")]
    ReplayInProgress,

    /// The writer loop has terminated and accepts no more events
    #[error("transaction log writer has stopped")]
    WriterStopped,

    /// The logger hit a fatal error earlier and must be recreated
    #[error("transaction logger has failed; restart with a fresh logger")]
    LoggerFailed,

    /// The event cannot be represented in the line format
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl TxLogError {
    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        TxLogError::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a parse error for the given 1-based line number
    pub fn parse(line: u64, reason: impl Into<String>) -> Self {
        TxLogError::Parse {
            line,
            reason: reason.into(),
        }
    }

    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            TxLogError::Parse { .. } => "KV_TXLOG_PARSE",
            TxLogError::Sequence { .. } => "KV_TXLOG_SEQUENCE",
            TxLogError::Io { .. } => "KV_TXLOG_IO",
            TxLogError::NotRunning => "KV_TXLOG_NOT_RUNNING",
            TxLogError::AlreadyRunning => "KV_TXLOG_ALREADY_RUNNING",
            TxLogError::AlreadyReplayed => "KV_TXLOG_ALREADY_REPLAYED",
            TxLogError::ReplayInProgress => "KV_TXLOG_REPLAY_IN_PROGRESS",
            TxLogError::WriterStopped => "KV_TXLOG_WRITER_STOPPED",
            TxLogError::LoggerFailed => "KV_TXLOG_FAILED",
            TxLogError::InvalidEvent(_) => "KV_TXLOG_INVALID_EVENT",
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        match self {
            TxLogError::Parse { .. } | TxLogError::Sequence { .. } | TxLogError::Io { .. } => {
                Severity::Fatal
            }
            _ => Severity::Error,
        }
    }

    /// Returns whether this error means the log cannot be trusted or extended
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for transaction log operations
pub type TxLogResult<T> = Result<T, TxLogError>;

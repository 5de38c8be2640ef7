//! Recovery error types
//!
//! Every recovery error is FATAL: the store must not serve traffic after a
//! partial replay.

use thiserror::Error;

use crate::txlog::TxLogError;

/// Result type for recovery operations
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Recovery errors
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The replay could not be started
    #[error("cannot start replay: {0}")]
    Start(#[source] TxLogError),

    /// The log stream reported an error after `applied` events
    #[error("replay aborted after {applied} events: {source}")]
    Replay {
        applied: u64,
        #[source]
        source: TxLogError,
    },

    /// Applying an event to storage failed
    #[error("cannot apply event {sequence}: {reason}")]
    Apply { sequence: u64, reason: String },
}

impl RecoveryError {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            RecoveryError::Start(_) => "KV_RECOVERY_START_FAILED",
            RecoveryError::Replay { source, .. } => source.code(),
            RecoveryError::Apply { .. } => "KV_RECOVERY_APPLY_FAILED",
        }
    }

    /// The underlying log error, if any
    pub fn txlog_error(&self) -> Option<&TxLogError> {
        match self {
            RecoveryError::Start(e) | RecoveryError::Replay { source: e, .. } => Some(e),
            RecoveryError::Apply { .. } => None,
        }
    }
}

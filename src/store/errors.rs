//! Store error types

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Key absent
    #[error("no such key")]
    NoSuchKey,
}

impl StoreError {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NoSuchKey => "KV_STORE_NO_SUCH_KEY",
        }
    }
}

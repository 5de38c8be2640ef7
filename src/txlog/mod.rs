//! Transaction log subsystem
//!
//! An append-only, line-oriented write-ahead log of store mutations.
//!
//! # Guarantees
//!
//! - Sequence numbers are assigned by the writer, strictly increasing
//! - Records are written in the order they were enqueued
//! - `write_*` never waits on disk, only on a full queue
//! - The first write failure stops the writer and is reported on `err()`
//! - Replay halts at the first malformed or out-of-sequence record
//!
//! # Known limitation
//!
//! The line format has no escaping, so keys and values containing tab or
//! newline characters are refused at enqueue time.

mod errors;
mod event;
mod file_logger;
mod logger;
mod reader;

pub use errors::{Severity, TxLogError, TxLogResult};
pub use event::{validate_key, validate_value, Event, EventType};
pub use file_logger::{FileTransactionLogger, LoggerOptions, SyncMode, DEFAULT_QUEUE_CAPACITY};
pub use logger::{EventStream, LoggerState, TransactionLogger};
pub use reader::{TxLogIterator, TxLogReader};

//! The transaction logger capability

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;

use super::errors::{TxLogError, TxLogResult};
use super::event::Event;

/// Lifecycle of a logger instance.
///
/// ```text
/// Uninitialized -> Replaying -> Uninitialized -> Running -> Failed
///                      \-> Failed
/// ```
///
/// `Failed` is terminal. Resuming requires a fresh logger on the same file,
/// which replays again to recompute the last sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    /// Not writing yet; replay may have completed
    Uninitialized,
    /// A replay stream is being produced
    Replaying,
    /// The writer loop is accepting events
    Running,
    /// A replay or write failed; the instance accepts nothing further
    Failed,
}

impl fmt::Display for LoggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoggerState::Uninitialized => "UNINITIALIZED",
            LoggerState::Replaying => "REPLAYING",
            LoggerState::Running => "RUNNING",
            LoggerState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// The two finite streams produced by a replay.
///
/// Both close on clean end of log. On failure exactly one error is sent
/// and both close; events emitted before the failure stay valid.
#[derive(Debug)]
pub struct EventStream {
    pub events: mpsc::Receiver<Event>,
    pub errors: mpsc::Receiver<TxLogError>,
}

/// Durable, ordered recording of store mutations.
pub trait TransactionLogger: Send + Sync + 'static {
    /// Queues a Put for persistence.
    ///
    /// Waits only while the queue is full. The outcome of the disk write is
    /// reported on [`err`](Self::err), never here.
    fn write_put(
        &self,
        key: String,
        value: String,
    ) -> impl Future<Output = TxLogResult<()>> + Send;

    /// Queues a Delete for persistence.
    fn write_delete(&self, key: String) -> impl Future<Output = TxLogResult<()>> + Send;

    /// Starts the writer loop. Must follow any replay.
    fn run(&self) -> TxLogResult<()>;

    /// Replays the log from its first record.
    fn read_events(&self) -> TxLogResult<EventStream>;

    /// Takes the writer's failure channel. Returns `None` before `run()` or
    /// once already taken.
    fn err(&self) -> Option<mpsc::Receiver<TxLogError>>;

    /// Current lifecycle state.
    fn state(&self) -> LoggerState;
}

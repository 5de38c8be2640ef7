//! Log replay for recovery
//!
//! Drains a replay stream into storage:
//! - events are applied strictly in stream order
//! - the error stream is checked once the event stream closes
//! - any error aborts; the caller must discard the partially built state

use crate::observability::Logger;
use crate::store::Store;
use crate::txlog::{Event, EventStream, EventType, TransactionLogger};

use super::errors::{RecoveryError, RecoveryResult};

/// Trait for applying replayed events to storage
pub trait StorageApply {
    /// Apply one event
    fn apply_event(&mut self, event: &Event) -> RecoveryResult<()>;
}

impl StorageApply for Store {
    fn apply_event(&mut self, event: &Event) -> RecoveryResult<()> {
        match event.kind {
            EventType::Put => self.put(event.key.as_str(), event.value.as_str()),
            EventType::Delete => self.delete(&event.key),
        }
        Ok(())
    }
}

/// Statistics from a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of events applied
    pub events_replayed: u64,
    pub puts: u64,
    pub deletes: u64,
    /// Sequence of the last applied event, 0 if none
    pub final_sequence: u64,
}

/// Applies replay streams to storage
pub struct EventReplayer;

impl EventReplayer {
    /// Drain `stream` into `storage`.
    ///
    /// Replay is idempotent: the same log replayed into two fresh stores
    /// yields identical contents.
    pub async fn replay<S: StorageApply>(
        stream: EventStream,
        storage: &mut S,
    ) -> RecoveryResult<ReplayStats> {
        let EventStream {
            mut events,
            mut errors,
        } = stream;
        let mut stats = ReplayStats::default();

        while let Some(event) = events.recv().await {
            storage.apply_event(&event)?;

            stats.events_replayed += 1;
            stats.final_sequence = event.sequence;
            match event.kind {
                EventType::Put => stats.puts += 1,
                EventType::Delete => stats.deletes += 1,
            }
        }

        if let Some(source) = errors.recv().await {
            return Err(RecoveryError::Replay {
                applied: stats.events_replayed,
                source,
            });
        }

        Ok(stats)
    }
}

/// Startup recovery: replay the logger's file into `storage`.
///
/// Must complete before the logger's `run()`.
pub async fn recover<L, S>(logger: &L, storage: &mut S) -> RecoveryResult<ReplayStats>
where
    L: TransactionLogger,
    S: StorageApply,
{
    let stream = logger.read_events().map_err(RecoveryError::Start)?;

    match EventReplayer::replay(stream, storage).await {
        Ok(stats) => {
            Logger::info(
                "RECOVERY_COMPLETE",
                &[
                    ("deletes", &stats.deletes.to_string()),
                    ("events_replayed", &stats.events_replayed.to_string()),
                    ("final_sequence", &stats.final_sequence.to_string()),
                    ("puts", &stats.puts.to_string()),
                ],
            );
            Ok(stats)
        }
        Err(e) => {
            Logger::fatal(
                "RECOVERY_FAILED",
                &[("code", e.code()), ("error", &e.to_string())],
            );
            Err(e)
        }
    }
}

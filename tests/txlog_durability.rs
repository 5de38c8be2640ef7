//! Transaction log durability tests
//!
//! Everything the writer accepted before a clean close must come back from
//! a replay on a fresh logger, in order, with the same sequence numbers.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use kvstore::recovery::recover;
use kvstore::store::Store;
use kvstore::txlog::{
    Event, EventStream, EventType, FileTransactionLogger, LoggerOptions, LoggerState, SyncMode,
    TransactionLogger, TxLogError, TxLogReader,
};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn open_logger(path: &Path) -> FileTransactionLogger {
    FileTransactionLogger::open(path, LoggerOptions::default()).expect("Failed to open logger")
}

async fn collect(stream: EventStream) -> (Vec<Event>, Option<TxLogError>) {
    let EventStream {
        mut events,
        mut errors,
    } = stream;
    let mut out = Vec::new();
    while let Some(event) = events.recv().await {
        out.push(event);
    }
    (out, errors.recv().await)
}

// =============================================================================
// Writes then replay
// =============================================================================

#[tokio::test]
async fn test_n_writes_replay_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tx.log");
    let n = 100u64;

    {
        let logger = open_logger(&path);
        logger.run().unwrap();
        for i in 1..=n {
            logger
                .write_put(format!("key{}", i), format!("value{}", i))
                .await
                .unwrap();
        }
        logger.close().await.unwrap();
    }

    let logger = open_logger(&path);
    let (events, error) = collect(logger.read_events().unwrap()).await;

    assert!(error.is_none(), "unexpected replay error: {:?}", error);
    assert_eq!(events.len() as u64, n);
    for (i, event) in events.iter().enumerate() {
        let i = i as u64 + 1;
        assert_eq!(event.sequence, i);
        assert_eq!(event.kind, EventType::Put);
        assert_eq!(event.key, format!("key{}", i));
        assert_eq!(event.value, format!("value{}", i));
    }
    assert_eq!(logger.state(), LoggerState::Uninitialized);
    assert_eq!(logger.last_sequence(), n);
}

#[tokio::test]
async fn test_restart_continues_numbering() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tx.log");

    for round in 0..3u64 {
        let logger = open_logger(&path);
        let mut store = Store::new();
        let stats = recover(&logger, &mut store).await.unwrap();
        assert_eq!(stats.events_replayed, round * 2);

        logger.run().unwrap();
        logger
            .write_put(format!("r{}", round), "v".into())
            .await
            .unwrap();
        logger.write_delete(format!("r{}", round)).await.unwrap();
        logger.close().await.unwrap();
        assert_eq!(logger.last_sequence(), round * 2 + 2);
    }

    let mut reader = TxLogReader::open(&path).unwrap();
    let sequences: Vec<u64> = reader
        .read_all()
        .unwrap()
        .iter()
        .map(|e| e.sequence)
        .collect();
    assert_eq!(sequences, (1..=6).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_writer_starts_above_replayed_sequence() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tx.log");
    fs::write(&path, "10\t2\ta\t1\n20\t2\tb\t2\n").unwrap();

    let logger = open_logger(&path);
    let (events, error) = collect(logger.read_events().unwrap()).await;
    assert_eq!(events.len(), 2);
    assert!(error.is_none());

    logger.run().unwrap();
    logger.write_put("c".into(), "3".into()).await.unwrap();
    logger.close().await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "10\t2\ta\t1\n20\t2\tb\t2\n21\t2\tc\t3\n");
}

#[tokio::test]
async fn test_exact_file_for_put_put_delete() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tx.log");

    let logger = open_logger(&path);
    logger.run().unwrap();
    logger.write_put("x".into(), "1".into()).await.unwrap();
    logger.write_put("y".into(), "2".into()).await.unwrap();
    logger.write_delete("x".into()).await.unwrap();
    logger.close().await.unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "1\t2\tx\t1\n2\t2\ty\t2\n3\t1\tx\t\n"
    );

    let logger = open_logger(&path);
    let mut store = Store::new();
    recover(&logger, &mut store).await.unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("y").unwrap(), "2");
}

#[tokio::test]
async fn test_concurrent_producers_each_keep_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tx.log");

    let logger = Arc::new(open_logger(&path));
    logger.run().unwrap();

    let mut handles = Vec::new();
    for producer in 0..4 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                logger
                    .write_put(format!("p{}", producer), i.to_string())
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    logger.close().await.unwrap();

    let events = TxLogReader::open(&path).unwrap().read_all().unwrap();
    assert_eq!(events.len(), 200);
    assert_eq!(events.last().unwrap().sequence, 200);

    // Total order interleaves producers, but each one's values stay ascending
    for producer in 0..4 {
        let key = format!("p{}", producer);
        let values: Vec<u32> = events
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.value.parse().unwrap())
            .collect();
        assert_eq!(values, (0..50).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_sync_mode_none_still_persists_on_close() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tx.log");
    let options = LoggerOptions {
        queue_capacity: 1,
        sync_mode: SyncMode::None,
    };

    let logger = FileTransactionLogger::open(&path, options).unwrap();
    logger.run().unwrap();
    for i in 0..20 {
        logger.write_put("k".into(), i.to_string()).await.unwrap();
    }
    logger.close().await.unwrap();

    let events = TxLogReader::open(&path).unwrap().read_all().unwrap();
    assert_eq!(events.len(), 20);
    assert_eq!(events[19].value, "19");
}

#[tokio::test]
async fn test_empty_log_replays_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tx.log");

    let logger = open_logger(&path);
    let (events, error) = collect(logger.read_events().unwrap()).await;

    assert!(events.is_empty());
    assert!(error.is_none());
    assert_eq!(logger.last_sequence(), 0);
}

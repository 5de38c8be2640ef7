//! File-backed transaction logger
//!
//! One append-only file per logger:
//! - `write_*` enqueue onto a bounded queue and return
//! - a single blocking writer thread owns the append handle, stamps each
//!   event with the next sequence number and appends one line
//! - the first write failure is published once on the error channel and
//!   stops the writer for good
//! - replay runs on its own blocking thread and streams events back

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::errors::{TxLogError, TxLogResult};
use super::event::Event;
use super::logger::{EventStream, LoggerState, TransactionLogger};
use super::reader::TxLogReader;
use crate::observability::{Logger, MetricsRegistry};

/// Default capacity of the writer queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// When appended records are forced to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// fsync after every record
    #[default]
    Fsync,
    /// Leave flushing to the OS
    None,
}

/// Tuning for a file logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerOptions {
    /// Capacity of the writer queue and of the replay event stream
    pub queue_capacity: usize,
    pub sync_mode: SyncMode,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sync_mode: SyncMode::default(),
        }
    }
}

/// State shared with the writer and replay threads
#[derive(Debug)]
struct Shared {
    state: Mutex<LoggerState>,
    last_sequence: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, LoggerState> {
        lock(&self.state)
    }

    fn set_state(&self, state: LoggerState) {
        *self.state() = state;
    }
}

/// Transaction logger over a single append-only file.
pub struct FileTransactionLogger {
    path: PathBuf,
    options: LoggerOptions,
    /// Read+append handle; moved into the writer thread by `run()`
    file: Mutex<Option<File>>,
    events: Mutex<Option<mpsc::Sender<Event>>>,
    errors: Mutex<Option<mpsc::Receiver<TxLogError>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    replayed: AtomicBool,
    shared: Arc<Shared>,
    metrics: Arc<MetricsRegistry>,
}

impl FileTransactionLogger {
    /// Opens the log for read and append, creating it and any missing parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns `KV_TXLOG_IO` if the directory or file cannot be created or
    /// opened.
    pub fn open(path: impl AsRef<Path>, options: LoggerOptions) -> TxLogResult<Self> {
        let path = path.as_ref().to_path_buf();

        if options.queue_capacity == 0 {
            return Err(TxLogError::InvalidEvent(
                "queue capacity must be greater than zero".into(),
            ));
        }

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    TxLogError::io(
                        format!("cannot create transaction log directory {}", dir.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| {
                TxLogError::io(
                    format!("cannot open transaction log file {}", path.display()),
                    e,
                )
            })?;

        Logger::info("TXLOG_OPENED", &[("path", &path.display().to_string())]);

        Ok(Self {
            path,
            options,
            file: Mutex::new(Some(file)),
            events: Mutex::new(None),
            errors: Mutex::new(None),
            writer: Mutex::new(None),
            replayed: AtomicBool::new(false),
            shared: Arc::new(Shared {
                state: Mutex::new(LoggerState::Uninitialized),
                last_sequence: AtomicU64::new(0),
            }),
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    /// Records counters into the given registry instead of a private one.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last sequence number assigned by the writer or accepted by replay.
    pub fn last_sequence(&self) -> u64 {
        self.shared.last_sequence.load(Ordering::SeqCst)
    }

    /// Stops accepting events and waits until everything queued so far has
    /// been written (or the writer has failed).
    ///
    /// Later `write_*` calls return `WriterStopped`.
    pub async fn close(&self) -> TxLogResult<()> {
        drop(lock(&self.events).take());

        let handle = lock(&self.writer).take();
        if let Some(handle) = handle {
            handle.await.map_err(|e| {
                TxLogError::io(
                    "transaction log writer panicked",
                    io::Error::new(io::ErrorKind::Other, e.to_string()),
                )
            })?;
        }

        Ok(())
    }

    /// A second handle on the open file positioned at its start.
    fn reopen_from_start(&self) -> TxLogResult<File> {
        let guard = lock(&self.file);
        let file = guard.as_ref().ok_or(TxLogError::AlreadyRunning)?;
        let mut handle = file
            .try_clone()
            .map_err(|e| TxLogError::io("cannot duplicate transaction log handle", e))?;
        handle
            .seek(SeekFrom::Start(0))
            .map_err(|e| TxLogError::io("cannot seek transaction log", e))?;
        Ok(handle)
    }

    /// Finds the highest stored sequence without emitting events.
    ///
    /// Used when `run()` is called without a replay so numbering still
    /// continues above every record already on disk.
    fn scan_last_sequence(&self) -> TxLogResult<u64> {
        let file = self.reopen_from_start()?;
        let mut reader = TxLogReader::new(BufReader::new(file), 0);
        while reader.read_next()?.is_some() {}
        Ok(reader.last_sequence_number())
    }

    /// Starts the writer loop over the sink built from the append handle.
    fn start_writer<W, F>(&self, sink: F) -> TxLogResult<()>
    where
        W: LogSink,
        F: FnOnce(File) -> W,
    {
        let mut state = self.shared.state();
        match *state {
            LoggerState::Uninitialized => {}
            LoggerState::Running => return Err(TxLogError::AlreadyRunning),
            LoggerState::Replaying => return Err(TxLogError::ReplayInProgress),
            LoggerState::Failed => return Err(TxLogError::LoggerFailed),
        }

        if !self.replayed.load(Ordering::SeqCst) {
            match self.scan_last_sequence() {
                Ok(last) => self.shared.last_sequence.store(last, Ordering::SeqCst),
                Err(e) => {
                    *state = LoggerState::Failed;
                    Logger::fatal(
                        "TXLOG_SCAN_FAILED",
                        &[("code", e.code()), ("error", &e.to_string())],
                    );
                    return Err(e);
                }
            }
        }

        let file = lock(&self.file).take().ok_or(TxLogError::AlreadyRunning)?;
        let (event_tx, event_rx) = mpsc::channel(self.options.queue_capacity);
        let (error_tx, error_rx) = mpsc::channel(1);

        let writer = WriterLoop {
            sink: sink(file),
            sync_mode: self.options.sync_mode,
            events: event_rx,
            errors: error_tx,
            shared: Arc::clone(&self.shared),
            metrics: Arc::clone(&self.metrics),
        };
        let handle = tokio::task::spawn_blocking(move || writer.run());

        *lock(&self.events) = Some(event_tx);
        *lock(&self.errors) = Some(error_rx);
        *lock(&self.writer) = Some(handle);
        *state = LoggerState::Running;

        let last = self.last_sequence().to_string();
        Logger::info(
            "TXLOG_WRITER_STARTED",
            &[
                ("last_sequence", &last),
                ("path", &self.path.display().to_string()),
            ],
        );

        Ok(())
    }

    async fn enqueue(&self, event: Event) -> TxLogResult<()> {
        event.validate()?;

        let sender = lock(&self.events).clone();
        let Some(sender) = sender else {
            return Err(match self.state() {
                LoggerState::Running => TxLogError::WriterStopped,
                LoggerState::Failed => TxLogError::LoggerFailed,
                _ => TxLogError::NotRunning,
            });
        };

        sender
            .send(event)
            .await
            .map_err(|_| TxLogError::WriterStopped)?;
        self.metrics.increment_events_enqueued();
        Ok(())
    }
}

impl TransactionLogger for FileTransactionLogger {
    async fn write_put(&self, key: String, value: String) -> TxLogResult<()> {
        self.enqueue(Event::put(key, value)).await
    }

    async fn write_delete(&self, key: String) -> TxLogResult<()> {
        self.enqueue(Event::delete(key)).await
    }

    fn run(&self) -> TxLogResult<()> {
        self.start_writer(|file| file)
    }

    fn read_events(&self) -> TxLogResult<EventStream> {
        let mut state = self.shared.state();
        match *state {
            LoggerState::Uninitialized => {}
            LoggerState::Running => return Err(TxLogError::AlreadyRunning),
            LoggerState::Replaying => return Err(TxLogError::ReplayInProgress),
            LoggerState::Failed => return Err(TxLogError::LoggerFailed),
        }
        if self.replayed.swap(true, Ordering::SeqCst) {
            return Err(TxLogError::AlreadyReplayed);
        }

        let file = self.reopen_from_start()?;
        let (event_tx, event_rx) = mpsc::channel(self.options.queue_capacity);
        let (error_tx, error_rx) = mpsc::channel(1);

        let replay = ReplayLoop {
            reader: TxLogReader::new(
                BufReader::new(file),
                self.shared.last_sequence.load(Ordering::SeqCst),
            ),
            events: event_tx,
            errors: error_tx,
            shared: Arc::clone(&self.shared),
            metrics: Arc::clone(&self.metrics),
        };
        *state = LoggerState::Replaying;
        drop(state);

        tokio::task::spawn_blocking(move || replay.run());

        Ok(EventStream {
            events: event_rx,
            errors: error_rx,
        })
    }

    fn err(&self) -> Option<mpsc::Receiver<TxLogError>> {
        lock(&self.errors).take()
    }

    fn state(&self) -> LoggerState {
        *self.shared.state()
    }
}

/// Destination of appended records.
trait LogSink: Write + Send + 'static {
    /// Forces appended records to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

impl LogSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// The writer thread: exclusive owner of the append handle.
struct WriterLoop<W> {
    sink: W,
    sync_mode: SyncMode,
    events: mpsc::Receiver<Event>,
    errors: mpsc::Sender<TxLogError>,
    shared: Arc<Shared>,
    metrics: Arc<MetricsRegistry>,
}

impl<W: LogSink> WriterLoop<W> {
    fn run(mut self) {
        while let Some(event) = self.events.blocking_recv() {
            let sequence = self.shared.last_sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let line = event.with_sequence(sequence).encode();

            if let Err(e) = self.append(line.as_bytes()) {
                let err = TxLogError::io(format!("failed to append transaction {}", sequence), e);
                Logger::fatal(
                    "TXLOG_WRITE_FAILED",
                    &[
                        ("code", err.code()),
                        ("error", &err.to_string()),
                        ("sequence", &sequence.to_string()),
                    ],
                );
                self.metrics.increment_write_failures();
                self.shared.set_state(LoggerState::Failed);
                // Closing the queue makes later enqueues fail instead of hang.
                self.events.close();
                let _ = self.errors.blocking_send(err);
                return;
            }

            self.metrics.increment_events_written();
            self.metrics.add_bytes_written(line.len() as u64);
        }

        Logger::info(
            "TXLOG_WRITER_STOPPED",
            &[(
                "last_sequence",
                &self.shared.last_sequence.load(Ordering::SeqCst).to_string(),
            )],
        );
    }

    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        self.sink.write_all(record)?;
        if self.sync_mode == SyncMode::Fsync {
            self.sink.sync()?;
        }
        Ok(())
    }
}

/// The replay thread: decodes records and streams them to the consumer.
struct ReplayLoop {
    reader: TxLogReader<BufReader<File>>,
    events: mpsc::Sender<Event>,
    errors: mpsc::Sender<TxLogError>,
    shared: Arc<Shared>,
    metrics: Arc<MetricsRegistry>,
}

impl ReplayLoop {
    fn run(self) {
        let mut iter = self.reader.into_iter();
        let mut emitted = 0u64;

        for event in &mut iter {
            self.shared
                .last_sequence
                .store(event.sequence, Ordering::SeqCst);
            if self.events.blocking_send(event).is_err() {
                // Consumer went away: the remaining records were never
                // applied, so this instance must not start numbering.
                Logger::error(
                    "TXLOG_REPLAY_ABANDONED",
                    &[("events_emitted", &emitted.to_string())],
                );
                self.shared.set_state(LoggerState::Failed);
                return;
            }
            emitted += 1;
            self.metrics.increment_events_replayed();
        }

        let last = iter.last_sequence_number().to_string();
        let offset = iter.current_offset().to_string();
        let records = iter.lines_read().to_string();
        match iter.into_error() {
            Some(err) => {
                Logger::fatal(
                    "TXLOG_REPLAY_FAILED",
                    &[
                        ("code", err.code()),
                        ("error", &err.to_string()),
                        ("events_emitted", &emitted.to_string()),
                        ("last_sequence", &last),
                        ("offset", &offset),
                        ("records", &records),
                    ],
                );
                self.shared.set_state(LoggerState::Failed);
                let _ = self.errors.blocking_send(err);
            }
            None => {
                Logger::info(
                    "TXLOG_REPLAY_COMPLETE",
                    &[
                        ("bytes", &offset),
                        ("events_emitted", &emitted.to_string()),
                        ("last_sequence", &last),
                    ],
                );
                self.shared.set_state(LoggerState::Uninitialized);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Key-value service
//!
//! Pairs every Store mutation with a transaction log write. The Store is
//! updated first, then the event is queued; the disk outcome arrives later
//! on the logger's error channel.
//!
//! Mutations are serialized through one write lock held from the Store
//! update until the event is queued, so the queue (and therefore the log)
//! sees changes in the same order as the Store.
//!
//! After the first writer failure the service is degraded: mutations are
//! refused so the Store never runs ahead of what a restart could replay.
//! Reads are still served.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::observability::{Logger, MetricsRegistry};
use crate::recovery::{recover, RecoveryError, ReplayStats};
use crate::store::{Store, StoreError};
use crate::txlog::{
    validate_key, validate_value, FileTransactionLogger, TransactionLogger, TxLogError,
};

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The transaction log failed earlier; writes are refused
    #[error("service degraded: transaction log is unavailable")]
    Degraded,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Key or value cannot be recorded in the log
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transaction log error: {0}")]
    Log(#[source] TxLogError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

impl From<TxLogError> for ServiceError {
    fn from(err: TxLogError) -> Self {
        match err {
            TxLogError::InvalidEvent(reason) => ServiceError::InvalidInput(reason),
            other => ServiceError::Log(other),
        }
    }
}

impl ServiceError {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Degraded => "KV_SERVICE_DEGRADED",
            ServiceError::Store(e) => e.code(),
            ServiceError::InvalidInput(_) => "KV_SERVICE_INVALID_INPUT",
            ServiceError::Log(e) => e.code(),
            ServiceError::Recovery(e) => e.code(),
        }
    }
}

/// The store plus its transaction log.
pub struct KvService<L: TransactionLogger> {
    store: Arc<Store>,
    logger: Arc<L>,
    metrics: Arc<MetricsRegistry>,
    degraded: Arc<AtomicBool>,
    /// Held across Store mutation and enqueue
    write_lock: Mutex<()>,
}

impl<L: TransactionLogger> KvService<L> {
    /// Wrap an already recovered store and a running logger.
    pub fn new(store: Arc<Store>, logger: Arc<L>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            store,
            logger,
            metrics,
            degraded: Arc::new(AtomicBool::new(false)),
            write_lock: Mutex::new(()),
        }
    }

    /// Set `key` to `value` and record a Put.
    pub async fn put(&self, key: String, value: String) -> ServiceResult<()> {
        validate_key(&key)?;
        validate_value(&value)?;
        let _guard = self.write_lock.lock().await;
        self.ensure_writable()?;

        self.store.put(key.as_str(), value.as_str());
        self.metrics.increment_puts();

        self.logger
            .write_put(key, value)
            .await
            .map_err(|e| self.enqueue_failed(e))
    }

    /// Remove `key` and record a Delete. Absent keys are still logged.
    pub async fn delete(&self, key: String) -> ServiceResult<()> {
        validate_key(&key)?;
        let _guard = self.write_lock.lock().await;
        self.ensure_writable()?;

        self.store.delete(&key);
        self.metrics.increment_deletes();

        self.logger
            .write_delete(key)
            .await
            .map_err(|e| self.enqueue_failed(e))
    }

    /// Look up `key`. Served while degraded.
    pub fn get(&self, key: &str) -> ServiceResult<String> {
        self.metrics.increment_gets();
        self.store.get(key).map_err(|e| {
            self.metrics.increment_not_found();
            ServiceError::from(e)
        })
    }

    /// Whether writes are being refused
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn logger(&self) -> &Arc<L> {
        &self.logger
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Waits for the writer's failure report and degrades the service.
    ///
    /// The task ends quietly if the channel closes without an error, which
    /// is what a clean shutdown looks like.
    pub fn watch_failures(&self, mut errors: mpsc::Receiver<TxLogError>) -> JoinHandle<()> {
        let degraded = Arc::clone(&self.degraded);
        tokio::spawn(async move {
            if let Some(err) = errors.recv().await {
                degraded.store(true, Ordering::SeqCst);
                Logger::fatal(
                    "SERVICE_DEGRADED",
                    &[("code", err.code()), ("error", &err.to_string())],
                );
            }
        })
    }

    fn ensure_writable(&self) -> ServiceResult<()> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        Ok(())
    }

    /// The Store has already been mutated; the log did not take the event.
    fn enqueue_failed(&self, err: TxLogError) -> ServiceError {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            Logger::fatal(
                "SERVICE_DEGRADED",
                &[("code", err.code()), ("error", &err.to_string())],
            );
        }
        ServiceError::from(err)
    }
}

impl KvService<FileTransactionLogger> {
    /// Startup: open the log, replay it into a fresh Store, start the
    /// writer and watch it.
    ///
    /// Any replay error aborts startup; nothing is served from a partial
    /// Store.
    pub async fn open(config: &Config) -> ServiceResult<(Self, ReplayStats)> {
        let metrics = Arc::new(MetricsRegistry::new());
        let logger = FileTransactionLogger::open(&config.log_path, config.logger_options())?
            .with_metrics(Arc::clone(&metrics));

        let mut store = Store::new();
        let stats = recover(&logger, &mut store).await?;
        logger.run()?;

        let service = Self::new(Arc::new(store), Arc::new(logger), metrics);
        if let Some(errors) = service.logger.err() {
            service.watch_failures(errors);
        }

        Logger::info(
            "SERVICE_READY",
            &[
                ("keys", &service.store.len().to_string()),
                ("log_path", &config.log_path.display().to_string()),
            ],
        );

        Ok((service, stats))
    }

    /// Flush queued events and stop the writer.
    pub async fn close(&self) -> ServiceResult<()> {
        self.logger.close().await?;
        Ok(())
    }
}

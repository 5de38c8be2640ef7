//! Observability
//!
//! - Structured JSON logging
//! - Lock-free counters exposed on `/metrics`
//!
//! Observability never affects execution: a failed log write is dropped.
//!
//! ```ignore
//! use kvstore::observability::{Logger, MetricsRegistry};
//!
//! Logger::info("SERVER_STARTED", &[("addr", "127.0.0.1:8080")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_puts();
//! ```

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

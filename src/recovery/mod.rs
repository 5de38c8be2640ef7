//! Startup recovery
//!
//! Rebuilds the in-memory store from the transaction log before any
//! traffic is served.
//!
//! # Startup Sequence (strict order)
//!
//! 1. Open the transaction logger
//! 2. `read_events()` from the first record
//! 3. Apply each event to a fresh store
//! 4. Observe the error stream; any error aborts startup
//! 5. Start the writer with `run()`

mod errors;
mod replay;

pub use errors::{RecoveryError, RecoveryResult};
pub use replay::{recover, EventReplayer, ReplayStats, StorageApply};

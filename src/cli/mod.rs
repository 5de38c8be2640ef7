//! Command-line interface
//!
//! - serve: replay the transaction log and serve HTTP
//! - verify: replay the transaction log and report what it holds

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{load_config, run, run_command, serve, verify, verify_log, VerifySummary};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};

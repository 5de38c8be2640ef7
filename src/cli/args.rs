//! CLI argument definitions using clap
//!
//! Commands:
//! - kvstore serve [--config <path>] [--port <port>]
//! - kvstore verify [--config <path>] [--log <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kvstore - an HTTP key-value store backed by a transaction log
#[derive(Parser, Debug)]
#[command(name = "kvstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the transaction log and serve HTTP
    Serve {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured HTTP port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Replay the transaction log without serving and report its contents
    Verify {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log file to check instead of the configured one
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["kvstore", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert!(config.is_none());
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from(["kvstore", "verify", "--log", "/tmp/tx.log"]).unwrap();
        match cli.command {
            Command::Verify { log, .. } => assert_eq!(log, Some(PathBuf::from("/tmp/tx.log"))),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["kvstore"]).is_err());
    }
}

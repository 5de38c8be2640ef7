//! kvstore - an HTTP key-value store made durable by an append-only
//! transaction log

pub mod cli;
pub mod config;
pub mod http_server;
pub mod observability;
pub mod recovery;
pub mod service;
pub mod store;
pub mod txlog;

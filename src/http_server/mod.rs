//! HTTP server
//!
//! # Endpoints
//!
//! - `PUT /v1/put` - set a key from a JSON body
//! - `GET /v1/key/:key` - read a key
//! - `DELETE /v1/key/:key` - remove a key
//! - `GET /health` - "ok" or "degraded"
//! - `GET /metrics` - counters as JSON

pub mod config;
pub mod kv_routes;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use kv_routes::SharedService;
pub use server::HttpServer;

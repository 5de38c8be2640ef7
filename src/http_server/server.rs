//! HTTP server
//!
//! Combines the key-value and observability routers behind a CORS layer.

use std::future::Future;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::kv_routes::{kv_routes, SharedService};
use super::observability_routes::observability_routes;
use crate::observability::Logger;

/// HTTP front end for a [`KvService`](crate::service::KvService)
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(service: SharedService) -> Self {
        Self::with_config(service, HttpServerConfig::default())
    }

    pub fn with_config(service: SharedService, config: HttpServerConfig) -> Self {
        let router = Self::build_router(service, &config);
        Self { config, router }
    }

    fn build_router(service: SharedService, config: &HttpServerConfig) -> Router {
        // No configured origins means any origin
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<HeaderValue> = config
                .cors_origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        Logger::warn("HTTP_CORS_ORIGIN_INVALID", &[("origin", origin)]);
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(observability_routes(service.clone()))
            .merge(kv_routes(service))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// The router, for in-process testing
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> std::io::Result<()> {
        self.start_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info(
            "HTTP_SERVER_STARTED",
            &[("addr", &listener.local_addr()?.to_string())],
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Logger::info("HTTP_SERVER_STOPPED", &[("addr", &addr.to_string())]);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        Logger::error("SHUTDOWN_SIGNAL_FAILED", &[("error", &e.to_string())]);
        std::future::pending::<()>().await;
    }
}

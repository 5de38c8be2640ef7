//! Observability HTTP routes
//!
//! `/health` reports whether writes are being accepted; `/metrics` exposes
//! the counter registry.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::kv_routes::SharedService;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,
    pub version: String,
}

/// Create observability routes
pub fn observability_routes(service: SharedService) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(service)
}

/// A degraded service still answers reads, so health stays 200.
async fn health_handler(State(service): State<SharedService>) -> impl IntoResponse {
    let status = if service.is_degraded() { "degraded" } else { "ok" };
    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(service): State<SharedService>) -> impl IntoResponse {
    (StatusCode::OK, Json(service.metrics().to_json()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "degraded".to_string(),
            version: "0.1.0".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["version"], "0.1.0");
    }
}

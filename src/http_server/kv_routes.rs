//! Key-value HTTP routes
//!
//! - `PUT /v1/put` with `{"key": "...", "value": "..."}` → 201
//! - `GET /v1/key/:key` → 200 with the raw value, 404 if absent
//! - `DELETE /v1/key/:key` → 204

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::observability::Logger;
use crate::service::{KvService, ServiceError};
use crate::txlog::{FileTransactionLogger, TxLogError};

/// The service as shared by all handlers
pub type SharedService = Arc<KvService<FileTransactionLogger>>;

#[derive(Debug, Deserialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create key-value routes
pub fn kv_routes(service: SharedService) -> Router {
    Router::new()
        .route("/v1/put", put(put_handler))
        .route("/v1/key/:key", get(get_handler).delete(delete_handler))
        .with_state(service)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: status.as_u16(),
        }),
    )
}

fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Store(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::Degraded
        | ServiceError::Log(TxLogError::WriterStopped | TxLogError::LoggerFailed) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ServiceError::Log(_) | ServiceError::Recovery(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn service_error(err: ServiceError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        Logger::error(
            "HTTP_REQUEST_FAILED",
            &[
                ("code", err.code()),
                ("error", &err.to_string()),
                ("status", status.as_str()),
            ],
        );
    }
    error_response(status, err.to_string())
}

async fn put_handler(
    State(service): State<SharedService>,
    payload: Result<Json<PutRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) =
        payload.map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;

    service
        .put(request.key, request.value)
        .await
        .map_err(service_error)?;

    Ok(StatusCode::CREATED)
}

async fn get_handler(
    State(service): State<SharedService>,
    Path(key): Path<String>,
) -> Result<String, ApiError> {
    service.get(&key).map_err(service_error)
}

async fn delete_handler(
    State(service): State<SharedService>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.delete(key).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

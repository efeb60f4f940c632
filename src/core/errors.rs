use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Errors raised by the document ingestion and retrieval pipeline.
///
/// Stage failures during ingestion are converted into a `failed` upload
/// status by the pipeline; they never reach the HTTP caller. Retrieval
/// failures propagate one level to the caller, which degrades to an empty
/// context block.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("embedding service error: {0}")]
    EmbeddingService(String),
    #[error("store write error: {0}")]
    StoreWrite(String),
    #[error("store query error: {0}")]
    StoreQuery(String),
    /// Failure around a scratch resource. Cleanup variants are logged and
    /// never escalated; setup variants abort the current document.
    #[error("temporary resource error: {0}")]
    TemporaryResource(String),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

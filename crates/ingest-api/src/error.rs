//! HTTP error response conversion.
//!
//! Preferred handler pattern: return `Result<impl IntoResponse, HttpAppError>`
//! and propagate `IngestError` with `?`; it converts via `From` and renders
//! consistently (status, body, logging).

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ingest_core::{ErrorMetadata, IngestError, LogLevel};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub code: String,
    pub recoverable: bool,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, code: impl Into<String>, recoverable: bool) -> Self {
        Self {
            error: error.into(),
            details: None,
            code: code.into(),
            recoverable,
        }
    }
}

/// Wraps `IngestError` for `IntoResponse` (orphan rule: neither the trait
/// nor the type lives in this crate on its own).
#[derive(Debug)]
pub struct HttpAppError(pub IngestError);

impl From<IngestError> for HttpAppError {
    fn from(err: IngestError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        Self(IngestError::Configuration(err.to_string()))
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(IngestError::Configuration(rejection.body_text()))
    }
}

fn log_error(err: &IngestError) {
    match err.log_level() {
        LogLevel::Warn => tracing::warn!(error = %err, code = err.error_code(), "request failed"),
        LogLevel::Error => tracing::error!(error = %err, code = err.error_code(), "request failed"),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let err = &self.0;
        log_error(err);

        let status =
            StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::new(err.to_string(), err.error_code(), err.is_recoverable());

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_stop_renders_200() {
        let err = HttpAppError(IngestError::IdempotencyStop {
            reason: "already done".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn asr_failed_renders_500() {
        let err = HttpAppError(IngestError::AsrFailed("retries exhausted".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

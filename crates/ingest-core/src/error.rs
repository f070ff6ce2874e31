//! Error taxonomy for the ingestion worker.
//!
//! `IngestError` unifies every failure mode from the controller down to the
//! persistence layer under one enum so call sites can match on the taxonomy
//! rather than threading `anyhow::Error` through every layer. Errors that the
//! design marks as non-fatal (transcoding failure, catalog lookup miss,
//! notifier failure, persistence-downstream-after-abort) are deliberately
//! *not* variants here — they are represented as ordinary `Ok` values
//! (a result struct field, an empty candidate list, a tallied counter)
//! because propagating them as `Err` would contradict the design.

use sqlx::Error as SqlxError;

/// Log level for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Error,
}

/// Self-describing metadata for an `IngestError` variant.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;
    fn error_code(&self) -> &'static str;
    fn is_recoverable(&self) -> bool;
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Missing/invalid environment configuration. Fatal at startup; no
    /// Video/IngestJob row is ever touched.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The ingress event was already `done` or is still `processing` within
    /// the timeout window. Not an error — reported to the caller as such.
    #[error("idempotency stop: {reason}")]
    IdempotencyStop { reason: String },

    /// ASR failed after exhausting retries. Fatal: job -> error, video ->
    /// ERROR, notification sent.
    #[error("ASR failed after retries: {0}")]
    AsrFailed(String),

    /// An LM call for one (segment, annotator) pair failed. Isolated by the
    /// orchestrator: contributes zero annotations, never aborts the batch.
    #[error("annotation failed for segment {segment_index} ({annotator}): {message}")]
    AnnotationFailed {
        segment_index: usize,
        annotator: String,
        message: String,
    },

    /// The first unrecoverable error hit while inserting occurrences. The
    /// transaction aborts here; everything after is tallied as skipped.
    #[error("persistence error on first failing annotation: {0}")]
    PersistenceFirstError(String),

    #[error("database error: {0}")]
    Database(#[from] SqlxError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ErrorMetadata for IngestError {
    fn http_status_code(&self) -> u16 {
        match self {
            IngestError::Configuration(_) => 500,
            IngestError::IdempotencyStop { .. } => 200,
            IngestError::AsrFailed(_) => 500,
            IngestError::AnnotationFailed { .. } => 500,
            IngestError::PersistenceFirstError(_) => 500,
            IngestError::Database(_) => 500,
            IngestError::Http(_) => 500,
            IngestError::Serialization(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            IngestError::Configuration(_) => "CONFIGURATION_ERROR",
            IngestError::IdempotencyStop { .. } => "IDEMPOTENCY_STOP",
            IngestError::AsrFailed(_) => "ASR_FAILED",
            IngestError::AnnotationFailed { .. } => "ANNOTATION_FAILED",
            IngestError::PersistenceFirstError(_) => "PERSISTENCE_FIRST_ERROR",
            IngestError::Database(_) => "DATABASE_ERROR",
            IngestError::Http(_) => "HTTP_ERROR",
            IngestError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::IdempotencyStop { .. } | IngestError::Http(_)
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            IngestError::IdempotencyStop { .. } | IngestError::AnnotationFailed { .. } => {
                LogLevel::Warn
            }
            _ => LogLevel::Error,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_stop_is_recoverable_and_200() {
        let err = IngestError::IdempotencyStop {
            reason: "already done".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.http_status_code(), 200);
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn asr_failed_is_fatal() {
        let err = IngestError::AsrFailed("retries exhausted".to_string());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "ASR_FAILED");
        assert_eq!(err.log_level(), LogLevel::Error);
    }
}

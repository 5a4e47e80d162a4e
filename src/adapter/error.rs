//! Adapter-boundary error type

use crate::error::ErrorKind;
use thiserror::Error;

/// Errors raised at the store-adapter boundary, classified into the
/// cross-cutting `ErrorKind` so callers don't match on per-store variants.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("connection refused or reset: {0}")]
    ConnectionFailed(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("backend returned {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("adapter internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::ConnectionFailed(_) | AdapterError::Timeout(_) => ErrorKind::BackendUnavailable,
            AdapterError::BackendStatus { status, .. } if *status >= 500 => ErrorKind::BackendUnavailable,
            AdapterError::BackendStatus { .. } => ErrorKind::QueryExecutionFailed,
            AdapterError::InvalidInput(_) => ErrorKind::ConfigurationError,
            AdapterError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            AdapterError::NotFound(_) => ErrorKind::QueryExecutionFailed,
            AdapterError::Internal(_) => ErrorKind::QueryExecutionFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_classify_as_backend_unavailable() {
        let err = AdapterError::BackendStatus { status: 503, body: "busy".into() };
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }

    #[test]
    fn client_errors_classify_as_query_execution_failed() {
        let err = AdapterError::BackendStatus { status: 400, body: "bad query".into() };
        assert_eq!(err.kind(), ErrorKind::QueryExecutionFailed);
    }
}

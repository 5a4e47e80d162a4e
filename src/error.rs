//! Shared error classification
//!
//! Subsystems keep their own `thiserror` enums (see `adapter::AdapterError`,
//! `extraction::PipelineError`, `query_gen::GenerationError`, ...). `ErrorKind`
//! is the cross-cutting classification used to decide retry/surface/downgrade
//! behavior without every call site matching on every subsystem's variants.

use std::fmt;

/// Cross-cutting error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// LLM returned no executable query. Surface to user, no retry.
    QueryGenerationFailed,
    /// Store rejected the synthesized query. Retry once (self-repair).
    QueryExecutionFailed,
    /// Ontology constraint violation. Downgrade to CLAIM or Quarantine.
    ValidationFailed,
    /// Confidence below 0.65. Quarantine the event.
    ConfidenceBelowThreshold,
    /// Connection refused/reset, 5xx, timeout. Retry with backoff (max 2).
    BackendUnavailable,
    /// Store returned an inconsistent shape. Surface; do not retry.
    SchemaMismatch,
    /// Empty/invalid tenant/workspace/ontology IDs. Fail fast.
    ConfigurationError,
    /// Pool saturated beyond deadline. Surface as timeout.
    ConcurrencyLimitExceeded,
}

impl ErrorKind {
    /// Whether this kind of failure is retriable under the backoff policy.
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorKind::BackendUnavailable | ErrorKind::QueryExecutionFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::QueryGenerationFailed => "query_generation_failed",
            ErrorKind::QueryExecutionFailed => "query_execution_failed",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::ConfidenceBelowThreshold => "confidence_below_threshold",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::ConcurrencyLimitExceeded => "concurrency_limit_exceeded",
        };
        write!(f, "{}", s)
    }
}

/// Top-level orchestrator error, wrapping subsystem errors via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("adapter error: {0}")]
    Adapter(#[from] crate::adapter::AdapterError),

    #[error("ontology error: {0}")]
    Ontology(#[from] crate::ontology::OntologyError),

    #[error("query generation error: {0}")]
    QueryGeneration(#[from] crate::query_gen::GenerationError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] crate::extraction::PipelineError),

    #[error("memory error: {0}")]
    Memory(#[from] crate::memory::MemoryError),

    #[error("chat model error: {0}")]
    Chat(#[from] crate::llm::ChatError),

    #[error("{kind}: {message}")]
    Classified { kind: ErrorKind, message: String },
}

impl OrchestratorError {
    pub fn classified(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Classified { kind, message: message.into() }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_unavailable_is_retriable() {
        assert!(ErrorKind::BackendUnavailable.is_retriable());
        assert!(ErrorKind::QueryExecutionFailed.is_retriable());
    }

    #[test]
    fn configuration_error_is_not_retriable() {
        assert!(!ErrorKind::ConfigurationError.is_retriable());
        assert!(!ErrorKind::ConfidenceBelowThreshold.is_retriable());
    }
}

//! Query generator error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The chat model returned no executable query at all: surfaced to the user, no retry.
    #[error("query generation failed: {0}")]
    NoExecutableQuery(String),

    /// The synthesized text isn't an allowed query form (only
    /// SELECT/WITH/ASK/CONSTRUCT/DESCRIBE for SPARQL; DDL/DML rejected).
    #[error("query rejected: {0}")]
    RejectedQuery(String),

    /// The store rejected the query on both the original attempt and the
    /// one self-repair retry. Carries the last attempted query text so
    /// the caller can surface it.
    #[error("query execution failed after repair attempt: {message}")]
    ExecutionFailed { attempted_query: String, message: String },

    #[error("chat model error: {0}")]
    Chat(#[from] crate::llm::ChatError),

    #[error("adapter error: {0}")]
    Adapter(#[from] crate::adapter::AdapterError),
}

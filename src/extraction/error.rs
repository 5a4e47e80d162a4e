//! Extraction pipeline error type.

use super::types::PipelineState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline transition: {from:?} -> {to:?}")]
    InvalidTransition { from: PipelineState, to: PipelineState },

    #[error("chat model call failed: {0}")]
    ChatFailed(String),

    #[error("chat model returned unparseable output: {0}")]
    UnparseableOutput(String),

    #[error("adapter error: {0}")]
    Adapter(#[from] crate::adapter::AdapterError),

    #[error("run cancelled")]
    Cancelled,
}

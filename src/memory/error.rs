//! Memory store error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("adapter error: {0}")]
    Adapter(#[from] crate::adapter::AdapterError),

    #[error("chat model error: {0}")]
    Chat(#[from] crate::llm::ChatError),

    #[error("embed model error: {0}")]
    Embed(#[from] crate::llm::EmbedError),

    #[error("unparseable memory candidate: {0}")]
    UnparseableCandidate(String),
}

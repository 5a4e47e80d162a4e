//! Embedding-capability client. Interface-only, same shape as `ChatClient` — a mock for tests
//! plus, behind the `embeddings` feature, a real ONNX-backed implementation.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),
    #[error("embedding invocation failed: {0}")]
    InvocationFailed(String),
}

#[async_trait]
pub trait EmbedClient: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Deterministic stand-in embedder for tests.
pub struct MockEmbedClient {
    dimension: usize,
    fail: bool,
}

impl MockEmbedClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, fail: false }
    }

    pub fn failing(dimension: usize) -> Self {
        Self { dimension, fail: true }
    }
}

#[async_trait]
impl EmbedClient for MockEmbedClient {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if self.fail {
            return Err(EmbedError::InvocationFailed("mock embed client configured to fail".to_string()));
        }
        Ok(crate::adapter::vector::fallback_embed(text, self.dimension))
    }
}

#[cfg(feature = "embeddings")]
pub struct FastEmbedClient {
    model: tokio::sync::Mutex<fastembed::TextEmbedding>,
    dimension: usize,
}

#[cfg(feature = "embeddings")]
impl FastEmbedClient {
    pub fn try_new(dimension: usize) -> Result<Self, EmbedError> {
        let model = fastembed::TextEmbedding::try_new(Default::default())
            .map_err(|e| EmbedError::Unavailable(format!("failed to load embedding model: {e}")))?;
        Ok(Self { model: tokio::sync::Mutex::new(model), dimension })
    }
}

#[cfg(feature = "embeddings")]
#[async_trait]
impl EmbedClient for FastEmbedClient {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut model = self.model.lock().await;
        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbedError::InvocationFailed(format!("fastembed call failed: {e}")))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::InvocationFailed("fastembed returned no embeddings".to_string()))
    }
}

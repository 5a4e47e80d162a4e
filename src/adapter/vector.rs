//! In-memory `VectorAdapter` reference implementation.
//!
//! Real deployments talk to a vector index service (pgvector, Qdrant, ...);
//! this crate only needs *an* implementation of the contract to exercise the
//! hybrid/rag orchestration code and the extraction pipeline's write stage.
//! Cosine similarity over a flat `Vec` is adequate at test scale (grounded
//! on the teacher's `SqliteStore::open_in_memory` "no external service
//! required for tests" pattern).

use super::error::AdapterError;
use super::traits::{ChunkHit, VectorAdapter, VectorFilters};
use async_trait::async_trait;
use dashmap::DashMap;

struct Entry {
    hit: ChunkHit,
    embedding: Vec<f32>,
}

pub struct InMemoryVectorAdapter {
    entries: DashMap<String, Entry>,
}

impl InMemoryVectorAdapter {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }
}

impl Default for InMemoryVectorAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Deterministic stand-in embedding used when no real embedding client is
/// configured: a bag-of-characters histogram, good enough to give
/// semantically-similar short strings a nonzero cosine similarity in tests.
pub fn fallback_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dimension];
    for (i, byte) in text.bytes().enumerate() {
        v[(byte as usize + i) % dimension] += 1.0;
    }
    v
}

fn matches_filters(hit: &ChunkHit, filters: &VectorFilters) -> bool {
    if let Some(ids) = &filters.document_ids {
        if !ids.contains(&hit.document_id) {
            return false;
        }
    }
    true
}

#[async_trait]
impl VectorAdapter for InMemoryVectorAdapter {
    async fn semantic_search(
        &self,
        query: &str,
        top_k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<ChunkHit>, AdapterError> {
        let query_embedding = fallback_embed(query, 256);
        let mut scored: Vec<ChunkHit> = self
            .entries
            .iter()
            .filter(|e| matches_filters(&e.hit, filters))
            .map(|e| {
                let mut hit = e.hit.clone();
                hit.similarity = cosine_similarity(&query_embedding, &e.embedding);
                hit
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn upsert_chunk(&self, hit: ChunkHit, embedding: Vec<f32>) -> Result<(), AdapterError> {
        if hit.chunk_id.is_empty() {
            return Err(AdapterError::InvalidInput("chunk_id must not be empty".into()));
        }
        self.entries.insert(hit.chunk_id.clone(), Entry { hit, embedding });
        Ok(())
    }
}

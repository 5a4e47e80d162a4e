//! In-memory `KvAdapter` reference implementation, including the JSON-
//! document + vector-index primitives the memory store is
//! built on.

use super::error::AdapterError;
use super::traits::KvAdapter;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

struct VectorIndex {
    dimension: usize,
    entries: Vec<(String, Vec<f32>, serde_json::Value)>,
}

pub struct InMemoryKvAdapter {
    strings: DashMap<String, String>,
    json: DashMap<String, serde_json::Value>,
    sorted_sets: DashMap<String, Vec<(String, f64)>>,
    sets: DashMap<String, std::collections::HashSet<String>>,
    vector_indexes: Mutex<std::collections::HashMap<String, VectorIndex>>,
}

impl InMemoryKvAdapter {
    pub fn new() -> Self {
        Self {
            strings: DashMap::new(),
            json: DashMap::new(),
            sorted_sets: DashMap::new(),
            sets: DashMap::new(),
            vector_indexes: Mutex::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryKvAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return candidate.starts_with(prefix);
    }
    pattern == candidate
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl KvAdapter for InMemoryKvAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>, AdapterError> {
        Ok(self.strings.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        self.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, AdapterError> {
        let removed_str = self.strings.remove(key).is_some();
        let removed_json = self.json.remove(key).is_some();
        Ok(removed_str || removed_json)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, AdapterError> {
        let mut out: Vec<String> = self.strings.iter().map(|e| e.key().clone()).filter(|k| glob_match(pattern, k)).collect();
        out.extend(self.json.iter().map(|e| e.key().clone()).filter(|k| glob_match(pattern, k)));
        out.sort();
        out.dedup();
        Ok(out)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>), AdapterError> {
        let all = self.keys(pattern).await?;
        let start = cursor as usize;
        let end = (start + count).min(all.len());
        if start >= all.len() {
            return Ok((0, vec![]));
        }
        let next_cursor = if end >= all.len() { 0 } else { end as u64 };
        Ok((next_cursor, all[start..end].to_vec()))
    }

    async fn json_get(&self, key: &str) -> Result<Option<serde_json::Value>, AdapterError> {
        Ok(self.json.get(key).map(|v| v.clone()))
    }

    async fn json_set(&self, key: &str, value: &serde_json::Value) -> Result<(), AdapterError> {
        self.json.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), AdapterError> {
        let mut set = self.sorted_sets.entry(key.to_string()).or_default();
        set.retain(|(m, _)| m != member);
        set.push((member.to_string(), score));
        set.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(())
    }

    async fn sorted_set_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>, AdapterError> {
        let set = match self.sorted_sets.get(key) {
            Some(s) => s.clone(),
            None => return Ok(vec![]),
        };
        let len = set.len() as isize;
        let norm = |i: isize| -> usize {
            let i = if i < 0 { (len + i).max(0) } else { i.min(len) };
            i as usize
        };
        let (s, e) = (norm(start), norm(stop + 1));
        Ok(if s < e { set[s..e].to_vec() } else { vec![] })
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, AdapterError> {
        let mut set = self.sets.entry(key.to_string()).or_default();
        Ok(set.insert(member.to_string()))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, AdapterError> {
        Ok(self.sets.get(key).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    async fn ensure_vector_index(&self, index_name: &str, dimension: usize) -> Result<(), AdapterError> {
        let mut indexes = self.vector_indexes.lock().await;
        let needs_recreate = indexes.get(index_name).map(|i| i.dimension != dimension).unwrap_or(true);
        if needs_recreate {
            indexes.insert(index_name.to_string(), VectorIndex { dimension, entries: Vec::new() });
        }
        Ok(())
    }

    async fn vector_add(&self, index_name: &str, key: &str, embedding: Vec<f32>, payload: serde_json::Value) -> Result<(), AdapterError> {
        let mut indexes = self.vector_indexes.lock().await;
        let index = indexes
            .get_mut(index_name)
            .ok_or_else(|| AdapterError::NotFound(format!("vector index {index_name}")))?;
        if embedding.len() != index.dimension {
            return Err(AdapterError::SchemaMismatch(format!(
                "embedding dimension {} does not match index dimension {}",
                embedding.len(),
                index.dimension
            )));
        }
        index.entries.retain(|(k, _, _)| k != key);
        index.entries.push((key.to_string(), embedding, payload));
        Ok(())
    }

    async fn vector_search(&self, index_name: &str, query: Vec<f32>, top_k: usize) -> Result<Vec<(String, f32, serde_json::Value)>, AdapterError> {
        let indexes = self.vector_indexes.lock().await;
        let index = indexes
            .get(index_name)
            .ok_or_else(|| AdapterError::NotFound(format!("vector index {index_name}")))?;
        let mut scored: Vec<(String, f32, serde_json::Value)> =
            index.entries.iter().map(|(k, v, p)| (k.clone(), cosine(&query, v), p.clone())).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vector_index_recreated_on_dimension_change() {
        let kv = InMemoryKvAdapter::new();
        kv.ensure_vector_index("idx", 4).await.unwrap();
        kv.vector_add("idx", "a", vec![1.0, 0.0, 0.0, 0.0], serde_json::json!({})).await.unwrap();
        kv.ensure_vector_index("idx", 8).await.unwrap();
        let err = kv.vector_add("idx", "a", vec![1.0, 0.0, 0.0, 0.0], serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, AdapterError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn sorted_set_range_supports_negative_indices() {
        let kv = InMemoryKvAdapter::new();
        kv.sorted_set_add("z", "a", 1.0).await.unwrap();
        kv.sorted_set_add("z", "b", 2.0).await.unwrap();
        kv.sorted_set_add("z", "c", 3.0).await.unwrap();
        let last_two = kv.sorted_set_range("z", -2, -1).await.unwrap();
        assert_eq!(last_two.iter().map(|(m, _)| m.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }
}

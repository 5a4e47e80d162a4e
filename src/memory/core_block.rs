//! Core block: a bounded, always-present freeform summary
//! per `(agent_id, user_id)`, re-derived when high-importance memories
//! accumulate.

use crate::adapter::KvAdapter;
use crate::ids::{AgentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_CHARS: usize = 2000;
pub const REWRITE_IMPORTANCE_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreBlock {
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

fn core_block_key(agent: &AgentId, user: &UserId) -> String {
    format!("agent_core_memory:{agent}:{user}")
}

pub async fn load(kv: &dyn KvAdapter, agent: &AgentId, user: &UserId) -> Result<Option<CoreBlock>, crate::adapter::AdapterError> {
    Ok(kv.json_get(&core_block_key(agent, user)).await?.and_then(|v| serde_json::from_value(v).ok()))
}

/// Stores `content`, truncated to `MAX_CHARS` on a char boundary.
pub async fn store(kv: &dyn KvAdapter, agent: &AgentId, user: &UserId, content: String) -> Result<CoreBlock, crate::adapter::AdapterError> {
    let truncated = truncate_to_limit(&content);
    let block = CoreBlock { content: truncated, updated_at: Utc::now() };
    kv.json_set(&core_block_key(agent, user), &serde_json::to_value(&block).expect("CoreBlock serializes")).await?;
    Ok(block)
}

fn truncate_to_limit(content: &str) -> String {
    if content.chars().count() <= MAX_CHARS {
        return content.to_string();
    }
    content.chars().take(MAX_CHARS).collect()
}

/// Whether adding a memory of this importance should trigger a core-block
/// rewrite trigger a
/// core-block rewrite").
pub fn should_rewrite(importance: f64) -> bool {
    importance >= REWRITE_IMPORTANCE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryKvAdapter;

    #[test]
    fn rewrite_threshold_matches_spec() {
        assert!(should_rewrite(0.8));
        assert!(!should_rewrite(0.79));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "x".repeat(MAX_CHARS + 500);
        assert_eq!(truncate_to_limit(&long).chars().count(), MAX_CHARS);
    }

    #[tokio::test]
    async fn store_and_load_round_trip() {
        let kv = InMemoryKvAdapter::new();
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");
        store(&kv, &agent, &user, "prefers concise answers".into()).await.unwrap();
        let block = load(&kv, &agent, &user).await.unwrap().unwrap();
        assert_eq!(block.content, "prefers concise answers");
    }
}

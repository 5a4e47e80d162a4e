//! Memory record shape and the fixed type→pool mapping.

use crate::ids::{AgentId, MemoryId, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `semantic`/`event` live in the agent pool; `preference`/`decision` MUST be
/// user pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Semantic,
    Event,
    Preference,
    Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPool {
    Agent,
    User,
}

impl MemoryType {
    pub fn pool(self) -> MemoryPool {
        match self {
            MemoryType::Semantic | MemoryType::Event => MemoryPool::Agent,
            MemoryType::Preference | MemoryType::Decision => MemoryPool::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    Active,
    Invalid,
}

/// Owner scope for a memory record: the agent pool is scoped by
/// `(agent_id, user_id)`; the user pool by `user_id` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryOwner {
    pub agent_id: Option<AgentId>,
    pub user_id: UserId,
}

impl MemoryOwner {
    pub fn agent(agent_id: AgentId, user_id: UserId) -> Self {
        Self { agent_id: Some(agent_id), user_id }
    }

    pub fn user(user_id: UserId) -> Self {
        Self { agent_id: None, user_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub memory_id: MemoryId,
    pub pool: MemoryPool,
    pub owner: MemoryOwner,
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: f64,
    pub status: MemoryStatus,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
    pub embedding: Option<Vec<f32>>,
    pub tags: Vec<String>,
    pub source_session_id: Option<SessionId>,
}

/// The KV key a record is persisted under: `memory:agent:{agent}:{user}:{id}`
/// for the agent pool, `memory:user:{user}:{id}` for the user pool.
pub fn memory_key(owner: &MemoryOwner, pool: MemoryPool, memory_id: &MemoryId) -> String {
    match pool {
        MemoryPool::Agent => {
            let agent = owner.agent_id.as_ref().expect("agent-pool memory must carry an agent_id");
            format!("memory:agent:{agent}:{}:{memory_id}", owner.user_id)
        }
        MemoryPool::User => format!("memory:user:{}:{memory_id}", owner.user_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_and_decision_route_to_user_pool() {
        assert_eq!(MemoryType::Preference.pool(), MemoryPool::User);
        assert_eq!(MemoryType::Decision.pool(), MemoryPool::User);
    }

    #[test]
    fn semantic_and_event_route_to_agent_pool() {
        assert_eq!(MemoryType::Semantic.pool(), MemoryPool::Agent);
        assert_eq!(MemoryType::Event.pool(), MemoryPool::Agent);
    }

    #[test]
    fn key_layout_matches_spec() {
        let owner = MemoryOwner::agent(AgentId::new("a1"), UserId::new("u1"));
        let key = memory_key(&owner, MemoryPool::Agent, &MemoryId::new("m1"));
        assert_eq!(key, "memory:agent:a1:u1:m1");

        let owner = MemoryOwner::user(UserId::new("u1"));
        let key = memory_key(&owner, MemoryPool::User, &MemoryId::new("m1"));
        assert_eq!(key, "memory:user:u1:m1");
    }
}

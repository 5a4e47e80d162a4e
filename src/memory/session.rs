//! Session store: a bounded ordered sequence of
//! `{role, content, timestamp}` per `(agent_id, user_id, session_id)`,
//! lazily created on first append, capped at 100 most-recent messages, and
//! tracked in a per-scope sorted index by last-update time.

use crate::adapter::KvAdapter;
use crate::ids::{AgentId, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_MESSAGES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub agent_id: AgentId,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub messages: Vec<SessionMessage>,
}

fn session_key(agent: &AgentId, user: &UserId, session: &SessionId) -> String {
    format!("agent_session:{agent}:{user}:{session}")
}

fn sessions_index_key(agent: &AgentId, user: &UserId) -> String {
    format!("agent_sessions:{agent}:{user}")
}

/// Appends a message to a session, creating it if absent, truncating to the
/// `MAX_MESSAGES` most recent entries, and bumping the scope's sorted index.
pub async fn append_message(
    kv: &dyn KvAdapter,
    agent: &AgentId,
    user: &UserId,
    session: &SessionId,
    message: SessionMessage,
) -> Result<Session, crate::adapter::AdapterError> {
    let key = session_key(agent, user, session);
    let mut s = match kv.json_get(&key).await? {
        Some(v) => serde_json::from_value(v).unwrap_or_else(|_| Session { agent_id: agent.clone(), user_id: user.clone(), session_id: session.clone(), messages: vec![] }),
        None => Session { agent_id: agent.clone(), user_id: user.clone(), session_id: session.clone(), messages: vec![] },
    };
    let timestamp = message.timestamp;
    s.messages.push(message);
    if s.messages.len() > MAX_MESSAGES {
        let overflow = s.messages.len() - MAX_MESSAGES;
        s.messages.drain(0..overflow);
    }
    kv.json_set(&key, &serde_json::to_value(&s).expect("Session serializes")).await?;
    kv.sorted_set_add(&sessions_index_key(agent, user), session.as_str(), timestamp.timestamp() as f64).await?;
    Ok(s)
}

pub async fn load_session(kv: &dyn KvAdapter, agent: &AgentId, user: &UserId, session: &SessionId) -> Result<Option<Session>, crate::adapter::AdapterError> {
    let key = session_key(agent, user, session);
    Ok(kv.json_get(&key).await?.and_then(|v| serde_json::from_value(v).ok()))
}

/// Session ids for `(agent, user)`, most-recently-updated last.
pub async fn list_sessions_by_recency(kv: &dyn KvAdapter, agent: &AgentId, user: &UserId) -> Result<Vec<String>, crate::adapter::AdapterError> {
    let entries = kv.sorted_set_range(&sessions_index_key(agent, user), 0, -1).await?;
    Ok(entries.into_iter().map(|(member, _)| member).collect())
}

/// Deletes every session for `(agent, user)` — used by agent/user data
/// cleanup.
pub async fn clear_sessions(kv: &dyn KvAdapter, agent: &AgentId, user: &UserId) -> Result<(), crate::adapter::AdapterError> {
    let ids = list_sessions_by_recency(kv, agent, user).await?;
    for id in ids {
        kv.del(&session_key(agent, user, &SessionId::new(id))).await?;
    }
    kv.del(&sessions_index_key(agent, user)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryKvAdapter;

    fn msg(content: &str, ts: DateTime<Utc>) -> SessionMessage {
        SessionMessage { role: "user".into(), content: content.into(), timestamp: ts }
    }

    #[tokio::test]
    async fn append_creates_session_lazily() {
        let kv = InMemoryKvAdapter::new();
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");
        let session = SessionId::new("s1");
        let s = append_message(&kv, &agent, &user, &session, msg("hi", Utc::now())).await.unwrap();
        assert_eq!(s.messages.len(), 1);
    }

    #[tokio::test]
    async fn caps_at_max_messages() {
        let kv = InMemoryKvAdapter::new();
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");
        let session = SessionId::new("s1");
        for i in 0..(MAX_MESSAGES + 10) {
            append_message(&kv, &agent, &user, &session, msg(&format!("msg{i}"), Utc::now())).await.unwrap();
        }
        let s = load_session(&kv, &agent, &user, &session).await.unwrap().unwrap();
        assert_eq!(s.messages.len(), MAX_MESSAGES);
        assert_eq!(s.messages.last().unwrap().content, format!("msg{}", MAX_MESSAGES + 9));
    }

    #[tokio::test]
    async fn clear_sessions_removes_index_and_entries() {
        let kv = InMemoryKvAdapter::new();
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");
        let session = SessionId::new("s1");
        append_message(&kv, &agent, &user, &session, msg("hi", Utc::now())).await.unwrap();
        clear_sessions(&kv, &agent, &user).await.unwrap();
        assert!(load_session(&kv, &agent, &user, &session).await.unwrap().is_none());
        assert!(list_sessions_by_recency(&kv, &agent, &user).await.unwrap().is_empty());
    }
}

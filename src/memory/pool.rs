//! `MemoryStore` — the dual-pool semantic memory contract:
//! `addMemory`, `searchMemories`, `assembleMemoryContext`, `extractMemories`,
//! `decayMemories`, and the agent/user cleanup lifecycle.
//!
//! Grounded on the teacher's `VectorStore` trait + `InMemoryVectorStore`
//! pairing, here built directly over the KV adapter's JSON + vector-index
//! primitives rather than a dedicated vector store, per spec
//! §4.3's "JSON documents ... FLOAT32 HNSW" schema.

use super::consolidation::{self, ConsolidationDecision};
use super::core_block;
use super::decay::{self, DecayDecision};
use super::error::MemoryError;
use super::record::{memory_key, MemoryOwner, MemoryPool as Pool, MemoryRecord, MemoryStatus, MemoryType};
use crate::adapter::KvAdapter;
use crate::ids::{AgentId, MemoryId, SessionId, UserId};
use crate::llm::{ChatClient, ChatRequest, EmbedClient};
use chrono::Utc;
use serde::Deserialize;

const AGENT_INDEX: &str = "idx:agent_memories";
const USER_INDEX: &str = "idx:user_memories";
const SIMILARITY_FLOOR: f32 = 0.3;
const CONSOLIDATION_CANDIDATES: usize = 3;

pub struct MemoryStore<'a> {
    pub kv: &'a dyn KvAdapter,
    pub embed: &'a dyn EmbedClient,
    pub chat: &'a dyn ChatClient,
}

pub struct AddMemoryRequest {
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: f64,
    pub tags: Vec<String>,
    pub source_session_id: Option<SessionId>,
}

fn index_for(pool: Pool) -> &'static str {
    match pool {
        Pool::Agent => AGENT_INDEX,
        Pool::User => USER_INDEX,
    }
}

impl<'a> MemoryStore<'a> {
    /// Embeds `content` and stores the record in the pool determined by its
    /// type. Embedding failure is non-fatal: the record is still written,
    /// just without a vector, so it is never surfaced by `searchMemories`
    ///.
    pub async fn add_memory(&self, agent: &AgentId, user: &UserId, req: AddMemoryRequest) -> Result<MemoryRecord, MemoryError> {
        let pool = req.memory_type.pool();
        let owner = match pool {
            Pool::Agent => MemoryOwner::agent(agent.clone(), user.clone()),
            Pool::User => MemoryOwner::user(user.clone()),
        };
        let now = Utc::now();
        let record = MemoryRecord {
            memory_id: MemoryId::new(uuid::Uuid::new_v4().to_string()),
            pool,
            owner,
            memory_type: req.memory_type,
            content: req.content,
            importance: req.importance.clamp(0.0, 1.0),
            status: MemoryStatus::Active,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            embedding: None,
            tags: req.tags,
            source_session_id: req.source_session_id,
        };
        self.persist(&record).await?;

        match self.embed.embed(&record.content).await {
            Ok(embedding) => {
                let mut with_embedding = record.clone();
                with_embedding.embedding = Some(embedding.clone());
                self.persist(&with_embedding).await?;
                self.index(agent, user, &with_embedding, embedding).await?;
                Ok(with_embedding)
            }
            Err(err) => {
                tracing::warn!(error = %err, memory_id = %record.memory_id, "embedding failed; memory stored without a vector");
                Ok(record)
            }
        }
    }

    async fn persist(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let key = memory_key(&record.owner, record.pool, &record.memory_id);
        self.kv.json_set(&key, &serde_json::to_value(record).expect("MemoryRecord serializes")).await?;
        Ok(())
    }

    async fn index(&self, agent: &AgentId, user: &UserId, record: &MemoryRecord, embedding: Vec<f32>) -> Result<(), MemoryError> {
        let index_name = index_for(record.pool);
        self.kv.ensure_vector_index(index_name, self.embed.dimension()).await?;
        let key = memory_key(&record.owner, record.pool, &record.memory_id);
        let payload = serde_json::json!({
            "memory_key": key,
            "agent_id": agent.to_string(),
            "user_id": user.to_string(),
        });
        self.kv.vector_add(index_name, &key, embedding, payload).await?;
        Ok(())
    }

    /// Runs KNN on both pools (agent pool filtered by `agent_id` + `user_id`,
    /// user pool filtered by `user_id`), unions results, drops similarity
    /// below 0.3, sorts descending, returns the top `top_k`. Access counts
    /// for the returned records are bumped afterwards.
    pub async fn search_memories(&self, agent: &AgentId, user: &UserId, query: &str, top_k: usize) -> Result<Vec<(MemoryRecord, f32)>, MemoryError> {
        let query_embedding = match self.embed.embed(query).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "memory search embedding failed; returning no recalled memories");
                return Ok(vec![]);
            }
        };

        let mut hits = Vec::new();
        for (index_name, pool) in [(AGENT_INDEX, Pool::Agent), (USER_INDEX, Pool::User)] {
            let candidates = self.kv.vector_search(index_name, query_embedding.clone(), top_k.max(CONSOLIDATION_CANDIDATES) * 4).await.unwrap_or_default();
            for (key, similarity, payload) in candidates {
                if !owned_by(&payload, pool, agent, user) {
                    continue;
                }
                if similarity < SIMILARITY_FLOOR {
                    continue;
                }
                if let Some(record) = self.kv.json_get(&key).await?.and_then(|v| serde_json::from_value::<MemoryRecord>(v).ok()) {
                    if record.status == MemoryStatus::Active {
                        hits.push((record, similarity));
                    }
                }
            }
        }

        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        self.bump_access_counts(&hits).await;
        Ok(hits)
    }

    /// Bumps `access_count`/`last_accessed` for recalled records. Runs inline rather
    /// than on a detached task: `MemoryStore` borrows its adapters rather
    /// than holding `Arc`s, so there is no `'static` handle to hand to
    /// `concurrency::spawn_bounded` here — a deployment that constructs the
    /// store over `Arc<dyn KvAdapter>` can background this for real without
    /// changing the call site.
    async fn bump_access_counts(&self, hits: &[(MemoryRecord, f32)]) {
        for (record, _) in hits {
            let mut updated = record.clone();
            updated.access_count += 1;
            updated.last_accessed = Utc::now();
            if let Err(err) = self.persist(&updated).await {
                tracing::warn!(error = %err, memory_id = %record.memory_id, "failed to bump memory access count");
            }
        }
    }

    /// Concatenates the core block with the top-K recalled memories,
    /// formatted `[type/pool] content (date)`.
    pub async fn assemble_memory_context(&self, agent: &AgentId, user: &UserId, query: &str, top_k: usize) -> Result<String, MemoryError> {
        let mut sections = Vec::new();
        if let Some(block) = core_block::load(self.kv, agent, user).await? {
            sections.push(block.content);
        }
        let recalled = self.search_memories(agent, user, query, top_k).await?;
        for (record, _) in recalled {
            sections.push(format!(
                "[{:?}/{:?}] {} ({})",
                record.memory_type,
                record.pool,
                record.content,
                record.created_at.format("%Y-%m-%d")
            ));
        }
        Ok(sections.join("\n"))
    }

    /// Prompts the chat model for memory candidates from a completed
    /// exchange, consolidates each against its top-3 similar existing
    /// memories, and rewrites the core block if a high-importance memory
    /// was added.
    pub async fn extract_memories(
        &self,
        agent: &AgentId,
        user: &UserId,
        user_message: &str,
        assistant_message: &str,
        session_id: Option<SessionId>,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let candidates = self.propose_candidates(user_message, assistant_message).await?;
        let mut written = Vec::new();
        let mut high_importance_touched = false;

        for candidate in candidates {
            let similar = self.search_memories(agent, user, &candidate.content, CONSOLIDATION_CANDIDATES).await?;
            let similar_records: Vec<MemoryRecord> = similar.into_iter().map(|(r, _)| r).collect();
            let decision = consolidation::decide(self.chat, &candidate.content, &similar_records).await?;

            match decision {
                ConsolidationDecision::Noop => continue,
                ConsolidationDecision::Update(i) => {
                    if let Some(existing) = similar_records.get(i) {
                        self.invalidate(existing).await?;
                    }
                    let record = self
                        .add_memory(
                            agent,
                            user,
                            AddMemoryRequest {
                                memory_type: candidate.memory_type,
                                content: candidate.content,
                                importance: candidate.importance,
                                tags: candidate.tags,
                                source_session_id: session_id.clone(),
                            },
                        )
                        .await?;
                    high_importance_touched |= record.importance >= core_block::REWRITE_IMPORTANCE_THRESHOLD;
                    written.push(record);
                }
                ConsolidationDecision::Add => {
                    let record = self
                        .add_memory(
                            agent,
                            user,
                            AddMemoryRequest {
                                memory_type: candidate.memory_type,
                                content: candidate.content,
                                importance: candidate.importance,
                                tags: candidate.tags,
                                source_session_id: session_id.clone(),
                            },
                        )
                        .await?;
                    high_importance_touched |= record.importance >= core_block::REWRITE_IMPORTANCE_THRESHOLD;
                    written.push(record);
                }
            }
        }

        if high_importance_touched {
            if let Err(err) = self.rewrite_core_block(agent, user).await {
                tracing::warn!(error = %err, "core block rewrite failed; leaving previous block in place");
            }
        }

        Ok(written)
    }

    async fn invalidate(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let mut invalidated = record.clone();
        invalidated.status = MemoryStatus::Invalid;
        self.persist(&invalidated).await
    }

    async fn propose_candidates(&self, user_message: &str, assistant_message: &str) -> Result<Vec<MemoryCandidate>, MemoryError> {
        let system = "Given a user message and an assistant reply, extract any durable memory \
                       candidates worth remembering. Respond with a JSON array of objects: \
                       {\"type\": \"semantic\"|\"event\"|\"preference\"|\"decision\", \"content\": string, \
                       \"importance\": number between 0 and 1, \"tags\": [string]}. Respond with [] if none."
            .to_string();
        let user = format!("User: {user_message}\nAssistant: {assistant_message}");
        let response = self.chat.complete(&ChatRequest { system, user }).await?;
        let json_text = crate::query_gen::repair::strip_markdown_fences(&response);
        let raw: Vec<RawCandidate> = serde_json::from_str(&json_text).map_err(|e| MemoryError::UnparseableCandidate(e.to_string()))?;
        Ok(raw.into_iter().filter_map(RawCandidate::into_candidate).collect())
    }

    async fn rewrite_core_block(&self, agent: &AgentId, user: &UserId) -> Result<(), MemoryError> {
        let recent = self.search_memories(agent, user, "", 20).await.unwrap_or_default();
        let important: Vec<&MemoryRecord> = recent.iter().map(|(r, _)| r).filter(|r| r.importance >= core_block::REWRITE_IMPORTANCE_THRESHOLD).collect();
        let previous = core_block::load(self.kv, agent, user).await?.map(|b| b.content).unwrap_or_default();
        let bullet_list: String = important.iter().map(|r| format!("- {}", r.content)).collect::<Vec<_>>().join("\n");
        let system = "Rewrite the agent's core memory summary given its previous summary and a list \
                       of newly important facts. Respond with the updated summary text only."
            .to_string();
        let user_prompt = format!("Previous summary:\n{previous}\n\nNew important facts:\n{bullet_list}");
        let rewritten = self.chat.complete(&ChatRequest { system, user: user_prompt }).await?;
        core_block::store(self.kv, agent, user, rewritten).await?;
        Ok(())
    }

    /// Applies the decay policy to every active
    /// memory owned by `(agent, user)` in the agent pool, plus every active
    /// memory owned by `user` in the user pool.
    pub async fn decay_memories(&self, agent: &AgentId, user: &UserId, now: chrono::DateTime<Utc>) -> Result<usize, MemoryError> {
        let mut touched = 0;
        for prefix in [format!("memory:agent:{agent}:{user}:"), format!("memory:user:{user}:")] {
            let keys = self.kv.keys(&format!("{prefix}*")).await?;
            for key in keys {
                let Some(mut record) = self.kv.json_get(&key).await?.and_then(|v| serde_json::from_value::<MemoryRecord>(v).ok()) else { continue };
                match decay::decide(&record, now) {
                    DecayDecision::NoChange => {}
                    DecayDecision::Invalidate => {
                        record.status = MemoryStatus::Invalid;
                        self.persist(&record).await?;
                        touched += 1;
                    }
                    DecayDecision::DecayImportance(new_importance) => {
                        record.importance = new_importance;
                        self.persist(&record).await?;
                        touched += 1;
                    }
                }
            }
        }
        Ok(touched)
    }

    /// Removes the agent pool, sessions, core block, and memory-graph
    /// cache for `(agent, user)`. The user pool is untouched.
    pub async fn clear_all_agent_data(&self, agent: &AgentId, user: &UserId) -> Result<(), MemoryError> {
        let keys = self.kv.keys(&format!("memory:agent:{agent}:{user}:*")).await?;
        for key in keys {
            self.kv.del(&key).await?;
        }
        super::session::clear_sessions(self.kv, agent, user).await?;
        self.kv.del(&format!("agent_core_memory:{agent}:{user}")).await?;
        self.kv.del(&format!("memory_graph:{agent}:{user}")).await?;
        Ok(())
    }

    /// Removes the user pool plus every cross-agent session, core block,
    /// and memory-graph cache for `user`.
    pub async fn clear_all_user_data(&self, user: &UserId) -> Result<(), MemoryError> {
        let keys = self.kv.keys(&format!("memory:user:{user}:*")).await?;
        for key in keys {
            self.kv.del(&key).await?;
        }
        // `agent_session:{agent}:{user}:{session}` has a trailing segment
        // after the user, so it needs a bounded `:user:` match; the other
        // three prefixes end in `:{user}` with nothing after it. Either way
        // the match must be on a whole path segment — an unbounded
        // `contains(":{user}")` would also delete `u10`'s keys while
        // clearing `u1`.
        let all = self.kv.keys("agent_session:*").await?;
        for key in all.into_iter().filter(|k| k.contains(&format!(":{user}:"))) {
            self.kv.del(&key).await?;
        }
        for prefix in ["agent_sessions:", "agent_core_memory:", "memory_graph:"] {
            let all = self.kv.keys(&format!("{prefix}*")).await?;
            for key in all.into_iter().filter(|k| k.ends_with(&format!(":{user}"))) {
                self.kv.del(&key).await?;
            }
        }
        Ok(())
    }
}

fn owned_by(payload: &serde_json::Value, pool: Pool, agent: &AgentId, user: &UserId) -> bool {
    let payload_user = payload.get("user_id").and_then(|v| v.as_str());
    match pool {
        Pool::Agent => {
            let payload_agent = payload.get("agent_id").and_then(|v| v.as_str());
            payload_agent == Some(agent.as_str()) && payload_user == Some(user.as_str())
        }
        Pool::User => payload_user == Some(user.as_str()),
    }
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(rename = "type")]
    kind: String,
    content: String,
    importance: f64,
    #[serde(default)]
    tags: Vec<String>,
}

struct MemoryCandidate {
    memory_type: MemoryType,
    content: String,
    importance: f64,
    tags: Vec<String>,
}

impl RawCandidate {
    fn into_candidate(self) -> Option<MemoryCandidate> {
        let memory_type = match self.kind.as_str() {
            "semantic" => MemoryType::Semantic,
            "event" => MemoryType::Event,
            "preference" => MemoryType::Preference,
            "decision" => MemoryType::Decision,
            _ => return None,
        };
        Some(MemoryCandidate { memory_type, content: self.content, importance: self.importance.clamp(0.0, 1.0), tags: self.tags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryKvAdapter;
    use crate::llm::MockChatClient;
    use crate::llm::MockEmbedClient;

    fn store<'a>(kv: &'a InMemoryKvAdapter, embed: &'a MockEmbedClient, chat: &'a MockChatClient) -> MemoryStore<'a> {
        MemoryStore { kv, embed, chat }
    }

    #[tokio::test]
    async fn add_memory_routes_preference_to_user_pool() {
        let kv = InMemoryKvAdapter::new();
        let embed = MockEmbedClient::new(32);
        let chat = MockChatClient::available();
        let store = store(&kv, &embed, &chat);
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");

        let record = store
            .add_memory(&agent, &user, AddMemoryRequest { memory_type: MemoryType::Preference, content: "prefers EUR".into(), importance: 0.6, tags: vec![], source_session_id: None })
            .await
            .unwrap();

        assert_eq!(record.pool, Pool::User);
        assert!(record.embedding.is_some());
    }

    #[tokio::test]
    async fn add_memory_survives_embedding_failure() {
        let kv = InMemoryKvAdapter::new();
        let embed = MockEmbedClient::failing(32);
        let chat = MockChatClient::available();
        let store = store(&kv, &embed, &chat);
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");

        let record = store
            .add_memory(&agent, &user, AddMemoryRequest { memory_type: MemoryType::Semantic, content: "fact".into(), importance: 0.5, tags: vec![], source_session_id: None })
            .await
            .unwrap();

        assert!(record.embedding.is_none());
    }

    #[tokio::test]
    async fn search_memories_filters_by_similarity_and_scope() {
        let kv = InMemoryKvAdapter::new();
        let embed = MockEmbedClient::new(32);
        let chat = MockChatClient::available();
        let store = store(&kv, &embed, &chat);
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");
        let other_user = UserId::new("u2");

        store
            .add_memory(&agent, &user, AddMemoryRequest { memory_type: MemoryType::Semantic, content: "quarterly revenue grew".into(), importance: 0.5, tags: vec![], source_session_id: None })
            .await
            .unwrap();
        store
            .add_memory(&agent, &other_user, AddMemoryRequest { memory_type: MemoryType::Semantic, content: "quarterly revenue grew".into(), importance: 0.5, tags: vec![], source_session_id: None })
            .await
            .unwrap();

        let hits = store.search_memories(&agent, &user, "quarterly revenue", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn decay_memories_invalidates_stale_low_importance() {
        let kv = InMemoryKvAdapter::new();
        let embed = MockEmbedClient::new(32);
        let chat = MockChatClient::available();
        let store = store(&kv, &embed, &chat);
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");

        let mut record = store
            .add_memory(&agent, &user, AddMemoryRequest { memory_type: MemoryType::Semantic, content: "stale fact".into(), importance: 0.1, tags: vec![], source_session_id: None })
            .await
            .unwrap();
        record.last_accessed = Utc::now() - chrono::Duration::days(100);
        store.persist(&record).await.unwrap();

        let touched = store.decay_memories(&agent, &user, Utc::now()).await.unwrap();
        assert_eq!(touched, 1);
    }

    #[tokio::test]
    async fn clear_all_agent_data_leaves_user_pool_intact() {
        let kv = InMemoryKvAdapter::new();
        let embed = MockEmbedClient::new(32);
        let chat = MockChatClient::available();
        let store = store(&kv, &embed, &chat);
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");

        store
            .add_memory(&agent, &user, AddMemoryRequest { memory_type: MemoryType::Semantic, content: "agent fact".into(), importance: 0.5, tags: vec![], source_session_id: None })
            .await
            .unwrap();
        store
            .add_memory(&agent, &user, AddMemoryRequest { memory_type: MemoryType::Preference, content: "user preference".into(), importance: 0.5, tags: vec![], source_session_id: None })
            .await
            .unwrap();

        store.clear_all_agent_data(&agent, &user).await.unwrap();

        let agent_keys = kv.keys(&format!("memory:agent:{agent}:{user}:*")).await.unwrap();
        let user_keys = kv.keys(&format!("memory:user:{user}:*")).await.unwrap();
        assert!(agent_keys.is_empty());
        assert_eq!(user_keys.len(), 1);
    }

    #[tokio::test]
    async fn clear_all_user_data_does_not_touch_a_user_whose_id_is_a_superstring() {
        let kv = InMemoryKvAdapter::new();
        let embed = MockEmbedClient::new(32);
        let chat = MockChatClient::available();
        let store = store(&kv, &embed, &chat);
        let agent = AgentId::new("a1");
        let user = UserId::new("u1");
        let lookalike = UserId::new("u10");

        store
            .add_memory(&agent, &user, AddMemoryRequest { memory_type: MemoryType::Preference, content: "u1 preference".into(), importance: 0.5, tags: vec![], source_session_id: None })
            .await
            .unwrap();
        store
            .add_memory(&agent, &lookalike, AddMemoryRequest { memory_type: MemoryType::Preference, content: "u10 preference".into(), importance: 0.5, tags: vec![], source_session_id: None })
            .await
            .unwrap();

        crate::memory::session::append_message(
            &kv,
            &agent,
            &user,
            &crate::ids::SessionId::new("s1"),
            crate::memory::session::SessionMessage { role: "user".into(), content: "hi".into(), timestamp: Utc::now() },
        )
        .await
        .unwrap();
        crate::memory::session::append_message(
            &kv,
            &agent,
            &lookalike,
            &crate::ids::SessionId::new("s1"),
            crate::memory::session::SessionMessage { role: "user".into(), content: "hi".into(), timestamp: Utc::now() },
        )
        .await
        .unwrap();
        kv.json_set(&format!("agent_core_memory:{agent}:{user}"), &serde_json::json!("note")).await.unwrap();
        kv.json_set(&format!("agent_core_memory:{agent}:{lookalike}"), &serde_json::json!("note")).await.unwrap();

        store.clear_all_user_data(&user).await.unwrap();

        assert!(kv.keys(&format!("memory:user:{user}:*")).await.unwrap().is_empty());
        assert!(kv.json_get(&format!("agent_session:{agent}:{user}:s1")).await.unwrap().is_none());
        assert!(kv.json_get(&format!("agent_core_memory:{agent}:{user}")).await.unwrap().is_none());

        assert!(!kv.keys(&format!("memory:user:{lookalike}:*")).await.unwrap().is_empty(), "u10's memory pool must survive clearing u1");
        assert!(kv.json_get(&format!("agent_session:{agent}:{lookalike}:s1")).await.unwrap().is_some(), "u10's session must survive clearing u1");
        assert!(kv.json_get(&format!("agent_core_memory:{agent}:{lookalike}")).await.unwrap().is_some(), "u10's core block must survive clearing u1");
    }
}

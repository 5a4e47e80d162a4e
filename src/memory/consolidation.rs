//! Consolidation: for each memory candidate,
//! the chat model is shown the top-3 similar existing memories and asked to
//! decide `ADD` / `UPDATE i` / `NOOP`.

use super::record::MemoryRecord;
use crate::llm::{ChatClient, ChatError, ChatRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidationDecision {
    Add,
    /// 0-based index into the `similar` slice passed to `decide`.
    Update(usize),
    Noop,
}

const SYSTEM_PROMPT: &str = "You are deciding whether a new memory candidate should be added, \
should replace one of the listed similar existing memories, or is redundant with one of them. \
Respond with exactly one line: `ADD`, `UPDATE <n>` (1-based index into the similar memories list), \
or `NOOP`.";

fn build_prompt(candidate: &str, similar: &[MemoryRecord]) -> String {
    let mut lines = vec![format!("Candidate memory: {candidate}"), String::new(), "Similar existing memories:".to_string()];
    if similar.is_empty() {
        lines.push("(none)".to_string());
    }
    for (i, m) in similar.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, m.content));
    }
    lines.join("\n")
}

fn parse_decision(response: &str, similar_len: usize) -> ConsolidationDecision {
    let trimmed = response.trim();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("ADD") {
        return ConsolidationDecision::Add;
    }
    if upper.starts_with("NOOP") {
        return ConsolidationDecision::Noop;
    }
    if let Some(rest) = upper.strip_prefix("UPDATE") {
        if let Some(n) = rest.trim().split_whitespace().next().and_then(|s| s.parse::<usize>().ok()) {
            if n >= 1 && n <= similar_len {
                return ConsolidationDecision::Update(n - 1);
            }
        }
    }
    // Unparseable or out-of-range responses default to ADD rather than
    // silently dropping the candidate.
    ConsolidationDecision::Add
}

pub async fn decide(chat: &dyn ChatClient, candidate: &str, similar: &[MemoryRecord]) -> Result<ConsolidationDecision, ChatError> {
    let request = ChatRequest { system: SYSTEM_PROMPT.to_string(), user: build_prompt(candidate, similar) };
    let response = chat.complete(&request).await?;
    Ok(parse_decision(&response, similar.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;
    use crate::memory::record::{MemoryOwner, MemoryPool, MemoryStatus, MemoryType};
    use chrono::Utc;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord {
            memory_id: "m1".into(),
            pool: MemoryPool::User,
            owner: MemoryOwner::user("u1".into()),
            memory_type: MemoryType::Preference,
            content: content.into(),
            importance: 0.5,
            status: MemoryStatus::Active,
            created_at: Utc::now(),
            last_accessed: Utc::now(),
            access_count: 0,
            embedding: None,
            tags: vec![],
            source_session_id: None,
        }
    }

    #[tokio::test]
    async fn parses_add() {
        let chat = MockChatClient::available().with_default_response("ADD");
        let decision = decide(&chat, "User prefers EUR", &[]).await.unwrap();
        assert_eq!(decision, ConsolidationDecision::Add);
    }

    #[tokio::test]
    async fn parses_update_with_index() {
        let chat = MockChatClient::available().with_default_response("UPDATE 1");
        let similar = vec![record("User prefers EUR")];
        let decision = decide(&chat, "User prefers euro currency", &similar).await.unwrap();
        assert_eq!(decision, ConsolidationDecision::Update(0));
    }

    #[tokio::test]
    async fn parses_noop() {
        let chat = MockChatClient::available().with_default_response("NOOP");
        let decision = decide(&chat, "duplicate", &[record("duplicate")]).await.unwrap();
        assert_eq!(decision, ConsolidationDecision::Noop);
    }

    #[tokio::test]
    async fn out_of_range_update_falls_back_to_add() {
        let chat = MockChatClient::available().with_default_response("UPDATE 9");
        let decision = decide(&chat, "x", &[record("y")]).await.unwrap();
        assert_eq!(decision, ConsolidationDecision::Add);
    }
}

//! NL -> Cypher synthesis and the deterministic rule-enforcement pass that
//! backs it. Prompt instructions alone can't be trusted to
//! hold an invariant, so every rule the prompt asks for is also enforced
//! here against whatever text the model actually returns.

use super::error::GenerationError;
use super::priming::build_cypher_priming;
use super::repair::strip_markdown_fences;
use crate::adapter::traits::{LpgAdapter, LpgSchema, Row};
use crate::llm::{ChatClient, ChatRequest};
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_LIMIT: usize = 200;

fn node_variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\s*([A-Za-z_]\w*)\s*(?::[\w`]+)?\s*(\{[^}]*\})?\s*\)").unwrap())
}

/// Every distinct node-pattern variable bound by a `MATCH`/`OPTIONAL MATCH`
/// clause, in first-seen order.
fn node_variables(cypher: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in node_variable_regex().captures_iter(cypher) {
        let var = caps[1].to_string();
        if !seen.contains(&var) {
            seen.push(var);
        }
    }
    seen
}

/// Index (byte offset) of the first clause keyword that should follow a
/// query's predicates, used as the insertion point for a synthesized
/// `WHERE` when none exists yet.
fn first_trailing_clause(cypher: &str) -> usize {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\b(RETURN|WITH|ORDER\s+BY|LIMIT|CALL)\b").unwrap());
    re.find(cypher).map(|m| m.start()).unwrap_or(cypher.len())
}

/// Appends `conditions` (already fully formed, e.g. `n.workspace_id = 'w1'`)
/// to the query: merged into an existing top-level `WHERE` if present,
/// otherwise inserted as a new `WHERE` before the first `RETURN`/`WITH`.
fn inject_conditions(cypher: &str, conditions: &[String]) -> String {
    if conditions.is_empty() {
        return cypher.to_string();
    }
    static WHERE_RE: OnceLock<Regex> = OnceLock::new();
    let where_re = WHERE_RE.get_or_init(|| Regex::new(r"(?i)\bWHERE\b").unwrap());
    let joined = conditions.join(" AND ");
    if let Some(m) = where_re.find(cypher) {
        let insert_at = m.end();
        format!("{} {} AND{}", &cypher[..insert_at], joined, &cypher[insert_at..])
    } else {
        let at = first_trailing_clause(cypher);
        format!("{}WHERE {} {}", &cypher[..at], joined, &cypher[at..])
    }
}

/// Injects `n.workspace_id = '{workspace_id}'` for every node variable that
/// doesn't already carry a `.workspace_id` predicate anywhere in the query.
pub fn enforce_workspace_isolation(cypher: &str, workspace_id: &str) -> String {
    let missing: Vec<String> = node_variables(cypher)
        .into_iter()
        .filter(|v| !cypher.contains(&format!("{v}.workspace_id")))
        .map(|v| format!("{v}.workspace_id = '{workspace_id}'"))
        .collect();
    inject_conditions(cypher, &missing)
}

/// Injects `n.source_document IN [...]` for every node variable not already
/// scoped, when the agent's folder set resolved to a non-empty document
/// list. A no-op when `document_ids` is empty.
pub fn enforce_document_scoping(cypher: &str, document_ids: &[String]) -> String {
    if document_ids.is_empty() {
        return cypher.to_string();
    }
    let list = document_ids.iter().map(|d| format!("'{d}'")).collect::<Vec<_>>().join(", ");
    let missing: Vec<String> = node_variables(cypher)
        .into_iter()
        .filter(|v| !cypher.contains(&format!("{v}.source_document")))
        .map(|v| format!("{v}.source_document IN [{list}]"))
        .collect();
    inject_conditions(cypher, &missing)
}

fn has_aggregate(cypher: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\b(count|sum|avg|min|max|collect)\s*\(").unwrap());
    re.is_match(cypher)
}

fn has_limit(cypher: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\bLIMIT\s+\d+\b").unwrap());
    re.is_match(cypher)
}

/// Appends a default `LIMIT` to non-aggregate queries that lack one.
pub fn enforce_limit(cypher: &str, default_limit: usize) -> String {
    if has_aggregate(cypher) || has_limit(cypher) {
        return cypher.to_string();
    }
    format!("{} LIMIT {default_limit}", cypher.trim_end())
}

/// Full rule-enforcement pass applied after repair and before execution.
pub fn enforce_rules(cypher: &str, workspace_id: &str, document_ids: &[String]) -> String {
    let cypher = enforce_workspace_isolation(cypher, workspace_id);
    let cypher = enforce_document_scoping(&cypher, document_ids);
    enforce_limit(&cypher, DEFAULT_LIMIT)
}

fn build_prompt(schema: &LpgSchema, workspace_id: &str, document_ids: &[String], question: &str) -> ChatRequest {
    let priming = build_cypher_priming(schema);
    let scope_note = if document_ids.is_empty() {
        String::new()
    } else {
        format!("\nThe query is scoped to these document ids: {}.", document_ids.join(", "))
    };
    ChatRequest {
        system: format!(
            "You translate natural-language questions into a single Cypher query against a labeled-property graph.\n{priming}\nWorkspace id for this request: {workspace_id}.{scope_note}\nReturn only the Cypher query, no commentary."
        ),
        user: question.to_string(),
    }
}

/// Synthesizes a Cypher query from `question`, then deterministically
/// enforces tenant isolation, document scoping, and the LIMIT rule
/// regardless of what the model actually produced.
pub async fn synthesize_cypher(
    chat: &dyn ChatClient,
    schema: &LpgSchema,
    workspace_id: &str,
    document_ids: &[String],
    question: &str,
) -> Result<String, GenerationError> {
    let request = build_prompt(schema, workspace_id, document_ids, question);
    let raw = chat.complete(&request).await?;
    let cleaned = strip_markdown_fences(&raw);
    if cleaned.is_empty() {
        return Err(GenerationError::NoExecutableQuery("chat model returned an empty Cypher query".to_string()));
    }
    Ok(enforce_rules(&cleaned, workspace_id, document_ids))
}

/// Runs `synthesize_cypher`, executes it, and on failure resubmits the
/// error plus original query and schema for one self-repair attempt before
/// giving up.
pub async fn execute_cypher_with_repair(
    chat: &dyn ChatClient,
    lpg: &dyn LpgAdapter,
    schema: &LpgSchema,
    workspace_id: &str,
    document_ids: &[String],
    question: &str,
) -> Result<Vec<Row>, GenerationError> {
    let query = synthesize_cypher(chat, schema, workspace_id, document_ids, question).await?;
    match lpg.run_cypher(&query, &serde_json::Value::Null).await {
        Ok(rows) => Ok(rows),
        Err(first_err) => {
            let priming = build_cypher_priming(schema);
            let repair_request = ChatRequest {
                system: format!(
                    "The previous Cypher query failed to execute against this schema:\n{priming}\nCorrect the query. Return only the corrected Cypher, no commentary."
                ),
                user: format!("Original query:\n{query}\n\nError:\n{first_err}"),
            };
            let raw = chat.complete(&repair_request).await?;
            let cleaned = strip_markdown_fences(&raw);
            let corrected = enforce_rules(&cleaned, workspace_id, document_ids);
            lpg.run_cypher(&corrected, &serde_json::Value::Null).await.map_err(|second_err| GenerationError::ExecutionFailed {
                attempted_query: corrected,
                message: second_err.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_workspace_filter_for_unguarded_variable() {
        let cypher = "MATCH (n:Customer) RETURN n";
        let fixed = enforce_workspace_isolation(cypher, "ws-1");
        assert!(fixed.contains("n.workspace_id = 'ws-1'"));
        assert!(fixed.contains("WHERE"));
    }

    #[test]
    fn leaves_already_guarded_variable_alone() {
        let cypher = "MATCH (n:Customer) WHERE n.workspace_id = 'ws-1' RETURN n";
        let fixed = enforce_workspace_isolation(cypher, "ws-1");
        assert_eq!(fixed.matches("workspace_id").count(), 1);
    }

    #[test]
    fn merges_into_existing_where_clause() {
        let cypher = "MATCH (n:Customer) WHERE n.name = 'Acme' RETURN n";
        let fixed = enforce_workspace_isolation(cypher, "ws-1");
        assert!(fixed.contains("n.workspace_id = 'ws-1' AND n.name = 'Acme'"));
    }

    #[test]
    fn document_scoping_noop_when_empty() {
        let cypher = "MATCH (n:Customer) RETURN n";
        assert_eq!(enforce_document_scoping(cypher, &[]), cypher);
    }

    #[test]
    fn document_scoping_injects_filter() {
        let cypher = "MATCH (n:Customer) RETURN n";
        let fixed = enforce_document_scoping(cypher, &["doc-1".to_string(), "doc-2".to_string()]);
        assert!(fixed.contains("n.source_document IN ['doc-1', 'doc-2']"));
    }

    #[test]
    fn limit_appended_to_non_aggregate_query() {
        let cypher = "MATCH (n:Customer) RETURN n";
        assert!(enforce_limit(cypher, 200).ends_with("LIMIT 200"));
    }

    #[test]
    fn limit_not_appended_to_aggregate_query() {
        let cypher = "MATCH (n:Customer) RETURN count(n)";
        assert_eq!(enforce_limit(cypher, 200), cypher);
    }

    #[test]
    fn limit_not_duplicated() {
        let cypher = "MATCH (n:Customer) RETURN n LIMIT 10";
        assert_eq!(enforce_limit(cypher, 200), cypher);
    }

    #[tokio::test]
    async fn synthesize_cypher_enforces_all_rules_on_naive_model_output() {
        let chat = crate::llm::MockChatClient::available();
        chat.push_response("MATCH (n:Customer) RETURN n").await;
        let schema = LpgSchema::default();
        let query = synthesize_cypher(&chat, &schema, "ws-1", &["doc-1".to_string()], "who are the customers?").await.unwrap();
        assert!(query.contains("n.workspace_id = 'ws-1'"));
        assert!(query.contains("n.source_document IN ['doc-1']"));
        assert!(query.contains("LIMIT"));
    }
}

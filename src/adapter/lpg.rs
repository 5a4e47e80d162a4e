//! In-memory `LpgAdapter` reference implementation: a minimal labeled-
//! property graph good enough to back concept lookups and the query
//! orchestrator's graph/neo4j/hybrid modes in tests.

use super::error::AdapterError;
use super::traits::{EdgeMerge, LpgAdapter, LpgSchema, LpgSession, NodeMerge, RelationshipPattern, Row};
use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

fn inline_map_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^}]*)\}").unwrap())
}

fn where_equality_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_]\w*\.(\w+)\s*=\s*(\$\w+|'[^']*'|\"[^\"]*\")").unwrap())
}

/// Resolves a raw token (`$param`, `'literal'`, or `"literal"`) against the
/// query's bound parameters.
fn resolve_token(token: &str, params: &serde_json::Value) -> Option<serde_json::Value> {
    let token = token.trim();
    if let Some(name) = token.strip_prefix('$') {
        return params.get(name).cloned();
    }
    if token.len() >= 2 && ((token.starts_with('\'') && token.ends_with('\'')) || (token.starts_with('"') && token.ends_with('"'))) {
        return Some(serde_json::json!(token[1..token.len() - 1]));
    }
    None
}

/// Extracts the property-equality constraints a generated Cypher query
/// actually carries: an inline node-pattern map (`{key: $param, ...}`) and
/// any `var.key = $param | 'literal'` predicate in a `WHERE` clause. Used
/// by [`InMemoryLpgAdapter::run_cypher`] to filter nodes without parsing
/// Cypher into a real execution plan.
fn equality_constraints(cypher: &str, params: &serde_json::Value) -> Vec<(String, serde_json::Value)> {
    let mut constraints = Vec::new();

    if let Some(caps) = inline_map_regex().captures(cypher) {
        for pair in caps[1].split(',') {
            let mut parts = pair.splitn(2, ':');
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                if let Some(resolved) = resolve_token(value, params) {
                    constraints.push((key.trim().trim_matches('`').to_string(), resolved));
                }
            }
        }
    }

    for caps in where_equality_regex().captures_iter(cypher) {
        if let Some(resolved) = resolve_token(&caps[2], params) {
            constraints.push((caps[1].to_string(), resolved));
        }
    }

    constraints
}

fn node_property_matches(node: &LpgNode, key: &str, value: &serde_json::Value) -> bool {
    node.properties.get(key) == Some(value)
}

#[derive(Debug, Clone)]
pub struct LpgNode {
    pub id: String,
    pub label: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct LpgEdge {
    pub rel_type: String,
    pub from_id: String,
    pub to_id: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

pub struct InMemoryLpgAdapter {
    nodes: DashMap<String, LpgNode>,
    edges: DashMap<String, LpgEdge>,
    session_counter: AtomicU64,
}

impl InMemoryLpgAdapter {
    pub fn new() -> Self {
        Self { nodes: DashMap::new(), edges: DashMap::new(), session_counter: AtomicU64::new(0) }
    }

    pub fn upsert_node(&self, node: LpgNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn upsert_edge(&self, edge_id: impl Into<String>, edge: LpgEdge) {
        self.edges.insert(edge_id.into(), edge);
    }

    pub fn contains_node(&self, canonical_id: &str) -> bool {
        self.nodes.contains_key(canonical_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Concept lookup used by the hybrid orchestrator:
    /// nodes whose `display_name` contains `term` (case-insensitive), plus
    /// edges touching them up to `depth` hops.
    pub fn concept_lookup(&self, term: &str, workspace_id: &str, depth: usize) -> Vec<LpgNode> {
        let needle = term.to_lowercase();
        let mut matched: Vec<LpgNode> = self
            .nodes
            .iter()
            .filter(|e| {
                e.properties.get("workspace_id").and_then(|v| v.as_str()) == Some(workspace_id)
                    && e.properties
                        .get("display_name")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .map(|e| e.value().clone())
            .collect();

        let mut frontier: Vec<String> = matched.iter().map(|n| n.id.clone()).collect();
        for _ in 0..depth.saturating_sub(1) {
            let mut next = Vec::new();
            for edge in self.edges.iter() {
                if frontier.contains(&edge.from_id) {
                    if let Some(n) = self.nodes.get(&edge.to_id) {
                        next.push(n.clone());
                    }
                }
            }
            frontier = next.iter().map(|n| n.id.clone()).collect();
            matched.extend(next);
        }
        matched
    }

    /// Edges touching any of `node_ids`, resolved to display names where
    /// available — used by the hybrid orchestrator's `KEY RELATIONSHIPS`
    /// context section.
    pub fn relations_touching(&self, node_ids: &[String]) -> Vec<(String, String, String)> {
        let ids: std::collections::HashSet<&String> = node_ids.iter().collect();
        self.edges
            .iter()
            .filter(|e| ids.contains(&e.from_id) || ids.contains(&e.to_id))
            .map(|e| {
                let resolve = |id: &str| -> String {
                    self.nodes
                        .get(id)
                        .and_then(|n| n.properties.get("display_name").and_then(|v| v.as_str()).map(str::to_string))
                        .unwrap_or_else(|| id.to_string())
                };
                (resolve(&e.from_id), e.rel_type.clone(), resolve(&e.to_id))
            })
            .collect()
    }
}

impl Default for InMemoryLpgAdapter {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemorySession {
    id: String,
}

impl LpgSession for InMemorySession {
    fn session_id(&self) -> &str {
        &self.id
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        tracing::debug!(session_id = %self.id, "lpg session released");
    }
}

#[async_trait]
impl LpgAdapter for InMemoryLpgAdapter {
    async fn run_cypher(&self, cypher: &str, params: &serde_json::Value) -> Result<Vec<Row>, AdapterError> {
        if cypher.trim().is_empty() {
            return Err(AdapterError::InvalidInput("empty cypher query".into()));
        }
        // The in-memory store doesn't parse Cypher into a real execution
        // plan; it extracts the property-equality constraints a generated
        // query actually carries (inline `{key: $param}` map, or
        // `var.key = 'literal' | $param` in WHERE) and filters nodes by
        // them, so callers that depend on equality filters (e.g. the
        // Resolve stage's cross-document lookup) see correct results
        // instead of every node in the graph.
        let constraints = equality_constraints(cypher, params);
        let rows = self
            .nodes
            .iter()
            .filter(|e| constraints.iter().all(|(key, value)| node_property_matches(e.value(), key, value)))
            .map(|e| Row(vec![serde_json::json!(e.id), serde_json::json!(e.label)]))
            .collect();
        Ok(rows)
    }

    async fn get_schema(&self) -> Result<LpgSchema, AdapterError> {
        let mut node_labels: Vec<String> = self.nodes.iter().map(|e| e.label.clone()).collect();
        node_labels.sort();
        node_labels.dedup();

        let mut relationship_types: Vec<RelationshipPattern> = self
            .edges
            .iter()
            .filter_map(|e| {
                let from_label = self.nodes.get(&e.from_id)?.label.clone();
                let to_label = self.nodes.get(&e.to_id)?.label.clone();
                Some(RelationshipPattern { rel_type: e.rel_type.clone(), from_label, to_label })
            })
            .collect();
        relationship_types.sort_by(|a, b| a.rel_type.cmp(&b.rel_type));
        relationship_types.dedup_by(|a, b| a.rel_type == b.rel_type && a.from_label == b.from_label && a.to_label == b.to_label);

        let sample_properties = self
            .nodes
            .iter()
            .take(10)
            .flat_map(|e| e.properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Vec<_>>())
            .collect();

        Ok(LpgSchema { node_labels, relationship_types, sample_properties })
    }

    async fn get_session(&self) -> Result<Box<dyn LpgSession>, AdapterError> {
        let id = self.session_counter.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(InMemorySession { id: format!("session_{id}") }))
    }

    async fn merge_node(&self, merge: NodeMerge) -> Result<(), AdapterError> {
        if merge.canonical_id.is_empty() {
            return Err(AdapterError::InvalidInput("canonical_id must not be empty".into()));
        }
        self.nodes
            .entry(merge.canonical_id.clone())
            .and_modify(|existing| {
                let existing_confidence = existing.properties.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);
                if merge.confidence > existing_confidence {
                    existing.properties.insert("confidence".into(), serde_json::json!(merge.confidence));
                    existing.properties.insert("claim_status".into(), serde_json::json!(merge.claim_status));
                }
                existing.properties.insert("updated_at".into(), serde_json::json!(merge.timestamp.to_rfc3339()));
                let mut docs: Vec<String> = existing
                    .properties
                    .get("source_doc_ids")
                    .and_then(|v| v.as_array())
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                for doc in &merge.source_doc_ids {
                    if !docs.contains(doc) {
                        docs.push(doc.clone());
                    }
                }
                existing.properties.insert("source_doc_ids".into(), serde_json::json!(docs));
                for (k, v) in &merge.attributes {
                    existing.properties.insert(k.clone(), v.clone());
                }
            })
            .or_insert_with(|| {
                let mut properties = merge.attributes.clone();
                properties.insert("display_name".into(), serde_json::json!(merge.display_name));
                properties.insert("confidence".into(), serde_json::json!(merge.confidence));
                properties.insert("claim_status".into(), serde_json::json!(merge.claim_status));
                properties.insert("updated_at".into(), serde_json::json!(merge.timestamp.to_rfc3339()));
                properties.insert("source_doc_ids".into(), serde_json::json!(merge.source_doc_ids));
                properties.insert("tenant_id".into(), serde_json::json!(merge.tenant_id));
                properties.insert("workspace_id".into(), serde_json::json!(merge.workspace_id));
                LpgNode { id: merge.canonical_id.clone(), label: merge.class.clone(), properties }
            });
        Ok(())
    }

    async fn merge_edge(&self, merge: EdgeMerge) -> Result<(), AdapterError> {
        if merge.from_canonical_id.is_empty() || merge.to_canonical_id.is_empty() {
            return Err(AdapterError::InvalidInput("edge endpoints must not be empty".into()));
        }
        let key = format!("{}:{}:{}", merge.relationship_type, merge.from_canonical_id, merge.to_canonical_id);
        self.edges
            .entry(key)
            .and_modify(|existing| {
                let existing_confidence = existing.properties.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);
                if merge.confidence > existing_confidence {
                    existing.properties.insert("confidence".into(), serde_json::json!(merge.confidence));
                    existing.properties.insert("claim_status".into(), serde_json::json!(merge.claim_status));
                }
                for (k, v) in &merge.attributes {
                    existing.properties.insert(k.clone(), v.clone());
                }
            })
            .or_insert_with(|| {
                let mut properties = merge.attributes.clone();
                properties.insert("confidence".into(), serde_json::json!(merge.confidence));
                properties.insert("claim_status".into(), serde_json::json!(merge.claim_status));
                LpgEdge { rel_type: merge.relationship_type.clone(), from_id: merge.from_canonical_id.clone(), to_id: merge.to_canonical_id.clone(), properties }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, label: &str, name: &str, ws: &str) -> LpgNode {
        let mut props = serde_json::Map::new();
        props.insert("display_name".into(), serde_json::json!(name));
        props.insert("workspace_id".into(), serde_json::json!(ws));
        LpgNode { id: id.to_string(), label: label.to_string(), properties: props }
    }

    #[test]
    fn concept_lookup_filters_by_workspace_and_term() {
        let adapter = InMemoryLpgAdapter::new();
        adapter.upsert_node(node("n1", "Person", "Alice Smith", "ws1"));
        adapter.upsert_node(node("n2", "Person", "Bob Jones", "ws2"));

        let hits = adapter.concept_lookup("alice", "ws1", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "n1");
    }

    #[tokio::test]
    async fn empty_cypher_rejected() {
        let adapter = InMemoryLpgAdapter::new();
        let err = adapter.run_cypher("", &serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn run_cypher_filters_by_inline_map_param() {
        let adapter = InMemoryLpgAdapter::new();
        adapter.upsert_node(node("n1", "Person", "Alice", "ws1"));
        adapter.upsert_node(node("n2", "Person", "Bob", "ws1"));

        let rows = adapter
            .run_cypher("MATCH (n:Person {display_name: $name}) RETURN n.canonical_id", &serde_json::json!({"name": "Alice"}))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0[0], serde_json::json!("n1"));
    }

    #[tokio::test]
    async fn run_cypher_filters_by_where_literal() {
        let adapter = InMemoryLpgAdapter::new();
        adapter.upsert_node(node("n1", "Person", "Alice", "ws1"));
        adapter.upsert_node(node("n2", "Person", "Bob", "ws2"));

        let rows = adapter.run_cypher("MATCH (n:Person) WHERE n.workspace_id = 'ws2' RETURN n", &serde_json::Value::Null).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0[0], serde_json::json!("n2"));
    }

    fn sample_merge(confidence: f64) -> NodeMerge {
        NodeMerge {
            canonical_id: "person_abc".into(),
            class: "Person".into(),
            display_name: "Alice".into(),
            attributes: serde_json::Map::new(),
            confidence,
            claim_status: "fact".into(),
            timestamp: chrono::Utc::now(),
            source_doc_ids: vec!["doc1".into()],
            tenant_id: "t1".into(),
            workspace_id: "ws1".into(),
        }
    }

    #[tokio::test]
    async fn merge_node_improves_confidence_monotonically() {
        let adapter = InMemoryLpgAdapter::new();
        adapter.merge_node(sample_merge(0.6)).await.unwrap();
        adapter.merge_node(sample_merge(0.4)).await.unwrap();
        let stored = adapter.nodes.get("person_abc").unwrap();
        assert_eq!(stored.properties.get("confidence").unwrap().as_f64().unwrap(), 0.6);
    }

    #[tokio::test]
    async fn merge_node_unions_source_doc_ids() {
        let adapter = InMemoryLpgAdapter::new();
        adapter.merge_node(sample_merge(0.6)).await.unwrap();
        let mut second = sample_merge(0.5);
        second.source_doc_ids = vec!["doc2".into()];
        adapter.merge_node(second).await.unwrap();
        let stored = adapter.nodes.get("person_abc").unwrap();
        let docs = stored.properties.get("source_doc_ids").unwrap().as_array().unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn merge_edge_is_idempotent_on_key() {
        let adapter = InMemoryLpgAdapter::new();
        let merge = EdgeMerge {
            relationship_type: "worksAt".into(),
            from_canonical_id: "person_abc".into(),
            to_canonical_id: "org_def".into(),
            confidence: 0.8,
            claim_status: "fact".into(),
            attributes: serde_json::Map::new(),
        };
        adapter.merge_edge(merge.clone()).await.unwrap();
        adapter.merge_edge(merge).await.unwrap();
        assert_eq!(adapter.edges.len(), 1);
    }
}

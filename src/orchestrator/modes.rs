//! Query orchestrator modes and the request/response shapes shared across
//! them.

use crate::ids::{AgentId, TenantId, WorkspaceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Vector only; low-result fallback may add a triplestore entity lookup.
    Rag,
    /// LPG via synthesized Cypher.
    Graph,
    /// Triplestore via synthesized SPARQL.
    GraphDb,
    /// Alias of `Graph` with a simpler prompt (no ontology priming needed).
    Neo4j,
    /// Runs RAG and GraphDb sequentially, returns both.
    Compare,
    /// Vector + LPG concept traversal, merged and reranked.
    Hybrid,
    /// Routed plan chooses among vector, LPG, triplestore, memory.
    Unified,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub tenant: TenantId,
    pub workspace: WorkspaceId,
    pub agent: AgentId,
    pub question: String,
    pub mode: Mode,
    /// Resolved document-id allow-list from the agent's attached folder set
    ///. Empty means unscoped.
    pub folder_document_ids: Vec<String>,
    pub top_k: usize,
    pub graph_depth: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sources {
    pub chunks: Vec<serde_json::Value>,
    pub graph_entities: Vec<serde_json::Value>,
    pub graph_chunks: Vec<serde_json::Value>,
    pub relations: Vec<(String, String, String)>,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub search_mode: String,
    pub cypher: Option<String>,
    pub sparql: Option<String>,
    pub result_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextGraph {
    pub nodes: Vec<serde_json::Value>,
    pub edges: Vec<serde_json::Value>,
    pub statistics: ContextGraphStatistics,
    pub provenance: ContextGraphProvenance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextGraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    /// Average edges per node, a crude density signal surfaced to callers
    ///.
    pub cardinality: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextGraphProvenance {
    pub query_mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub content: String,
    pub sources: Sources,
    pub metadata: Metadata,
    pub context_graph: Option<ContextGraph>,
    pub reasoning_trace: Option<Vec<String>>,
}

//! Store adapter trait contracts

use super::error::AdapterError;
use crate::ids::{DocumentId, TenantId, WorkspaceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------
// Vector
// ---------------------------------------------------------------------

/// Filters accepted by `VectorAdapter::semantic_search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorFilters {
    pub tenant_id: Option<TenantId>,
    pub workspace_id: Option<WorkspaceId>,
    pub doc_type: Option<String>,
    pub context_type: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub document_ids: Option<Vec<DocumentId>>,
}

/// A ranked chunk returned from a semantic search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk_id: String,
    pub document_id: DocumentId,
    pub document_name: String,
    pub chunk_index: usize,
    pub page_span: Option<(u32, u32)>,
    pub text: String,
    pub similarity: f32,
}

#[async_trait]
pub trait VectorAdapter: Send + Sync {
    async fn semantic_search(
        &self,
        query: &str,
        top_k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<ChunkHit>, AdapterError>;

    /// Insert or replace a chunk's embedding. Not in spec.md's adapter
    /// contract proper but required for the extraction pipeline's Write
    /// stage and the in-memory adapter's tests to have anything to search.
    async fn upsert_chunk(&self, hit: ChunkHit, embedding: Vec<f32>) -> Result<(), AdapterError>;
}

// ---------------------------------------------------------------------
// LPG (labeled-property graph)
// ---------------------------------------------------------------------

/// A single ordered row of primitive-typed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row(pub Vec<serde_json::Value>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipPattern {
    pub rel_type: String,
    pub from_label: String,
    pub to_label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LpgSchema {
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<RelationshipPattern>,
    pub sample_properties: Vec<(String, serde_json::Value)>,
}

/// Scoped session with guaranteed release of any backing resource on every
/// exit path — release happens in `Drop`, mirroring the teacher's
/// `getSession()`-scoped-context contract.
pub trait LpgSession: Send {
    fn session_id(&self) -> &str;
}

/// A node upsert as seen by the Write stage: MERGE-on-
/// canonical-id, monotonically improving confidence and timestamp,
/// union-appending `source_doc_ids`.
#[derive(Debug, Clone)]
pub struct NodeMerge {
    pub canonical_id: String,
    pub class: String,
    pub display_name: String,
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub confidence: f64,
    pub claim_status: String,
    pub timestamp: DateTime<Utc>,
    pub source_doc_ids: Vec<String>,
    pub tenant_id: String,
    pub workspace_id: String,
}

#[derive(Debug, Clone)]
pub struct EdgeMerge {
    pub relationship_type: String,
    pub from_canonical_id: String,
    pub to_canonical_id: String,
    pub confidence: f64,
    pub claim_status: String,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait LpgAdapter: Send + Sync {
    async fn run_cypher(&self, cypher: &str, params: &serde_json::Value) -> Result<Vec<Row>, AdapterError>;

    async fn get_schema(&self) -> Result<LpgSchema, AdapterError>;

    async fn get_session(&self) -> Result<Box<dyn LpgSession>, AdapterError>;

    /// Idempotent node upsert, MERGE-on-canonical-id.
    async fn merge_node(&self, merge: NodeMerge) -> Result<(), AdapterError>;

    /// Idempotent edge upsert, MERGE-on-(relationship_type, endpoints).
    async fn merge_edge(&self, merge: EdgeMerge) -> Result<(), AdapterError>;
}

// ---------------------------------------------------------------------
// Triplestore
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphType {
    Global,
    Tenant,
    Workspace,
    Data,
    Audit,
    Deprecated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlOptions {
    pub timeout: Option<std::time::Duration>,
    pub reasoning: bool,
}

/// A SPARQL SELECT result set: ordered variable names plus row bindings
/// keyed the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlResult {
    pub variables: Vec<String>,
    pub rows: Vec<std::collections::HashMap<String, serde_json::Value>>,
}

#[async_trait]
pub trait TriplestoreAdapter: Send + Sync {
    async fn execute_sparql(
        &self,
        tenant: &TenantId,
        workspace: &WorkspaceId,
        query: &str,
        graph_type: GraphType,
        options: &SparqlOptions,
    ) -> Result<SparqlResult, AdapterError>;

    async fn import_turtle(&self, graph_iri: &str, turtle: &str) -> Result<usize, AdapterError>;

    async fn count_triples_in_graph(&self, graph_iri: &str) -> Result<u64, AdapterError>;

    async fn create_named_graph(&self, graph_iri: &str) -> Result<(), AdapterError>;

    async fn drop_named_graph(&self, graph_iri: &str) -> Result<(), AdapterError>;

    async fn list_ontologies(&self, scope: GraphType) -> Result<Vec<String>, AdapterError>;
}

// ---------------------------------------------------------------------
// SQL federator
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlColumn {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlResult {
    pub columns: Vec<SqlColumn>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<SqlColumn>,
    /// Column names inferred as primary key by naming convention.
    pub primary_key: Vec<String>,
    /// (column, referenced_table) pairs inferred the same way.
    pub foreign_keys: Vec<(String, String)>,
}

#[async_trait]
pub trait SqlFederator: Send + Sync {
    async fn execute_sql(
        &self,
        sql: &str,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<SqlResult, AdapterError>;

    async fn introspect_schema(&self, catalog: &str, schema: &str) -> Result<Vec<TableSchema>, AdapterError>;

    async fn check_connection(&self) -> Result<(), AdapterError>;
}

// ---------------------------------------------------------------------
// KV
// ---------------------------------------------------------------------

#[async_trait]
pub trait KvAdapter: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AdapterError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AdapterError>;
    async fn del(&self, key: &str) -> Result<bool, AdapterError>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, AdapterError>;
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>), AdapterError>;

    async fn json_get(&self, key: &str) -> Result<Option<serde_json::Value>, AdapterError>;
    async fn json_set(&self, key: &str, value: &serde_json::Value) -> Result<(), AdapterError>;

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), AdapterError>;
    async fn sorted_set_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<(String, f64)>, AdapterError>;

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, AdapterError>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>, AdapterError>;

    /// Create a vector index over a key prefix if it does not already exist,
    /// or recreate it if `dimension` diverges from what's stored.
    async fn ensure_vector_index(&self, index_name: &str, dimension: usize) -> Result<(), AdapterError>;

    /// KNN search by cosine distance over vectors previously added via
    /// `vector_add`.
    async fn vector_add(&self, index_name: &str, key: &str, embedding: Vec<f32>, payload: serde_json::Value) -> Result<(), AdapterError>;
    async fn vector_search(&self, index_name: &str, query: Vec<f32>, top_k: usize) -> Result<Vec<(String, f32, serde_json::Value)>, AdapterError>;
}

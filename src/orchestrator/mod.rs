//! Query Orchestrator: the single entry point that fans a
//! [`QueryRequest`] out to vector search, Cypher/SPARQL synthesis, hybrid
//! retrieval, or a routed combination of those, and always returns a
//! [`QueryResponse`].

pub mod context_graph;
pub mod hybrid;
pub mod modes;
pub mod terms;

pub use modes::{ContextGraph, Metadata, Mode, QueryRequest, QueryResponse, Sources};

use crate::adapter::lpg::InMemoryLpgAdapter;
use crate::adapter::traits::{ChunkHit, GraphType, SparqlOptions, VectorFilters};
use crate::adapter::{TriplestoreAdapter, VectorAdapter};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ids::DocumentId;
use crate::llm::{ChatClient, ChatRequest};
use crate::ontology::schema::OntologySchema;
use crate::query_gen::{cypher, sparql};

/// Below this many vector hits, `rag` mode also probes the triplestore for
/// matching entities rather than answering from a thin context alone.
const LOW_RESULT_THRESHOLD: usize = 3;

const RAG_GROUNDING_PROMPT: &str =
    "Answer the user's question using only the supplied document excerpts. If they don't contain the answer, say so rather than guessing.";

/// Wires the store adapters, chat model, and ontology schema the orchestrator
/// needs to answer a query in any mode. Holds borrowed dependencies rather
/// than owning them, matching [`crate::extraction::pipeline::Pipeline`]'s
/// shape: callers construct adapters once and lend them per request.
pub struct Orchestrator<'a> {
    pub vector: &'a dyn VectorAdapter,
    pub lpg: &'a InMemoryLpgAdapter,
    pub triplestore: &'a dyn TriplestoreAdapter,
    pub chat: &'a dyn ChatClient,
    pub ontology_schema: &'a OntologySchema,
}

impl<'a> Orchestrator<'a> {
    pub async fn run_query(&self, request: QueryRequest) -> OrchestratorResult<QueryResponse> {
        match request.mode {
            Mode::Rag => self.run_rag(&request).await,
            Mode::Graph | Mode::Neo4j => self.run_graph(&request).await,
            Mode::GraphDb => self.run_graphdb(&request).await,
            Mode::Compare => self.run_compare(&request).await,
            Mode::Hybrid => self.run_hybrid(&request).await,
            Mode::Unified => self.run_unified(&request).await,
        }
    }

    fn vector_filters(&self, request: &QueryRequest) -> VectorFilters {
        VectorFilters {
            tenant_id: Some(request.tenant.clone()),
            workspace_id: Some(request.workspace.clone()),
            document_ids: if request.folder_document_ids.is_empty() {
                None
            } else {
                Some(request.folder_document_ids.iter().cloned().map(DocumentId::new).collect())
            },
            ..Default::default()
        }
    }

    /// Vector-only retrieval; falls back to a broad triplestore probe when
    /// the vector index returns too few hits to ground an answer.
    async fn run_rag(&self, request: &QueryRequest) -> OrchestratorResult<QueryResponse> {
        let filters = self.vector_filters(request);
        let hits = self.vector.semantic_search(&request.question, request.top_k, &filters).await?;

        let mut sources = Sources { chunks: hits.iter().map(|h| serde_json::to_value(h).unwrap_or_default()).collect(), ..Default::default() };

        if hits.len() < LOW_RESULT_THRESHOLD {
            if let Ok(result) = self
                .triplestore
                .execute_sparql(&request.tenant, &request.workspace, "SELECT ?s ?p ?o WHERE { ?s ?p ?o }", GraphType::Data, &SparqlOptions::default())
                .await
            {
                sources.graph_entities = result
                    .rows
                    .into_iter()
                    .filter(|row| !row.get("p").and_then(|v| v.as_str()).map(crate::ontology::vocab::is_excluded_predicate).unwrap_or(false))
                    .map(|row| serde_json::to_value(row).unwrap_or_default())
                    .collect();
            }
        }

        let context = build_document_context(&hits);
        let answer = self
            .chat
            .complete(&ChatRequest { system: RAG_GROUNDING_PROMPT.to_string(), user: format!("Context:\n{context}\n\nQuestion: {}", request.question) })
            .await?;

        Ok(QueryResponse {
            content: answer,
            sources,
            metadata: Metadata { search_mode: "rag".to_string(), result_count: Some(hits.len()), ..Default::default() },
            context_graph: None,
            reasoning_trace: None,
        })
    }

    /// LPG retrieval via synthesized, rule-enforced Cypher.
    async fn run_graph(&self, request: &QueryRequest) -> OrchestratorResult<QueryResponse> {
        let schema = self.lpg.get_schema().await?;
        let rows = cypher::execute_cypher_with_repair(self.chat, self.lpg, &schema, request.workspace.as_str(), &request.folder_document_ids, &request.question).await?;
        let content = format_rows(&rows);
        let result_count = rows.len();
        Ok(QueryResponse {
            content,
            sources: Sources { graph_entities: rows.into_iter().map(|r| serde_json::to_value(r).unwrap_or_default()).collect(), ..Default::default() },
            metadata: Metadata { search_mode: "graph".to_string(), result_count: Some(result_count), ..Default::default() },
            context_graph: None,
            reasoning_trace: None,
        })
    }

    /// Triplestore retrieval via synthesized, repaired SPARQL.
    async fn run_graphdb(&self, request: &QueryRequest) -> OrchestratorResult<QueryResponse> {
        let sample_rows: Vec<serde_json::Value> = Vec::new();
        let result = sparql::execute_sparql_with_repair(
            self.chat,
            self.triplestore,
            &request.tenant,
            &request.workspace,
            self.ontology_schema,
            &sample_rows,
            GraphType::Data,
            &SparqlOptions::default(),
            &request.question,
        )
        .await?;
        let result_count = result.rows.len();
        let content = format_sparql_rows(&result.variables, &result.rows);
        Ok(QueryResponse {
            content,
            sources: Sources { graph_entities: result.rows.into_iter().map(|row| serde_json::to_value(row).unwrap_or_default()).collect(), ..Default::default() },
            metadata: Metadata { search_mode: "graphdb".to_string(), result_count: Some(result_count), ..Default::default() },
            context_graph: None,
            reasoning_trace: None,
        })
    }

    /// Runs rag and graphdb sequentially, isolating each from the other's
    /// failure, and returns both answers side by side.
    async fn run_compare(&self, request: &QueryRequest) -> OrchestratorResult<QueryResponse> {
        let rag_result = self.run_rag(request).await;
        let graphdb_result = self.run_graphdb(request).await;

        let mut content = String::new();
        let mut sources = Sources::default();
        let mut metadata = Metadata { search_mode: "compare".to_string(), ..Default::default() };

        match rag_result {
            Ok(r) => {
                content.push_str("RAG ANSWER:\n");
                content.push_str(&r.content);
                sources.chunks = r.sources.chunks;
            }
            Err(err) => content.push_str(&format!("RAG ANSWER: (failed: {err})")),
        }
        content.push_str("\n\nGRAPHDB ANSWER:\n");
        match graphdb_result {
            Ok(r) => {
                content.push_str(&r.content);
                sources.graph_entities = r.sources.graph_entities;
                metadata.result_count = r.metadata.result_count;
            }
            Err(err) => content.push_str(&format!("(failed: {err})")),
        }

        Ok(QueryResponse { content, sources, metadata, context_graph: None, reasoning_trace: None })
    }

    /// Vector + LPG concept traversal, merged and reranked, with context-
    /// graph enrichment attached.
    async fn run_hybrid(&self, request: &QueryRequest) -> OrchestratorResult<QueryResponse> {
        let filters = self.vector_filters(request);
        let result = hybrid::run_hybrid(
            self.chat,
            self.vector,
            self.lpg,
            request.workspace.as_str(),
            &request.question,
            &filters,
            request.top_k,
            request.graph_depth.max(1),
            hybrid::DEFAULT_MAX_CONTEXT_CHUNKS,
        )
        .await?;

        let graph = context_graph::build_context_graph(&result.matched_nodes, &result.relations, Mode::Hybrid);
        let trace = context_graph::reasoning_trace(Mode::Hybrid, &result.key_terms, result.matched_nodes.len(), result.merged_chunks.len());

        let sources = Sources {
            chunks: result.merged_chunks.iter().filter(|c| !matches!(c.source, hybrid::ChunkSource::Graph)).map(|c| serde_json::to_value(c).unwrap_or_default()).collect(),
            graph_chunks: result.merged_chunks.iter().filter(|c| !matches!(c.source, hybrid::ChunkSource::Vector)).map(|c| serde_json::to_value(c).unwrap_or_default()).collect(),
            graph_entities: result.matched_nodes.iter().map(|n| serde_json::json!({"id": n.id, "label": n.label, "properties": n.properties})).collect(),
            relations: result.relations,
            documents: Vec::new(),
        };

        Ok(QueryResponse {
            content: result.answer,
            sources,
            metadata: Metadata { search_mode: "hybrid".to_string(), result_count: Some(result.merged_chunks.len()), ..Default::default() },
            context_graph: Some(graph),
            reasoning_trace: Some(trace),
        })
    }

    /// Routes the question to whichever non-unified mode looks like the
    /// best fit, then tags the response's `search_mode` so callers can tell
    /// a unified answer from a direct-mode one.
    async fn run_unified(&self, request: &QueryRequest) -> OrchestratorResult<QueryResponse> {
        let chosen = choose_unified_mode(&request.question);
        let mut response = match chosen {
            Mode::Compare => self.run_compare(request).await?,
            Mode::Graph | Mode::Neo4j => self.run_graph(request).await?,
            Mode::GraphDb => self.run_graphdb(request).await?,
            Mode::Hybrid => self.run_hybrid(request).await?,
            Mode::Rag | Mode::Unified => self.run_rag(request).await?,
        };
        response.metadata.search_mode = format!("unified:{}", response.metadata.search_mode);
        Ok(response)
    }
}

/// Deterministic routing heuristic for unified mode: keyword cues pick a
/// concrete mode rather than an LLM planner call, so routing never itself
/// depends on model availability.
fn choose_unified_mode(question: &str) -> Mode {
    let q = question.to_lowercase();
    if q.contains("compare") || q.contains(" versus ") || q.contains(" vs ") {
        Mode::Compare
    } else if q.contains("relationship") || q.contains("connected to") || q.contains("related to") || q.contains(" path ") {
        Mode::Graph
    } else if q.contains("network") || q.contains("who knows") {
        Mode::Hybrid
    } else {
        Mode::Rag
    }
}

fn build_document_context(hits: &[ChunkHit]) -> String {
    if hits.is_empty() {
        return "(no matching document excerpts)".to_string();
    }
    hits.iter().enumerate().map(|(i, h)| format!("{}. [{}] {}", i + 1, h.document_name, h.text)).collect::<Vec<_>>().join("\n")
}

fn format_rows(rows: &[crate::adapter::traits::Row]) -> String {
    if rows.is_empty() {
        return "(no matching rows)".to_string();
    }
    rows.iter().map(|r| serde_json::to_string(&r.0).unwrap_or_default()).collect::<Vec<_>>().join("\n")
}

fn format_sparql_rows(variables: &[String], rows: &[std::collections::HashMap<String, serde_json::Value>]) -> String {
    if rows.is_empty() {
        return "(no matching rows)".to_string();
    }
    rows.iter()
        .map(|row| {
            variables
                .iter()
                .map(|v| format!("{v}={}", row.get(v).cloned().unwrap_or(serde_json::Value::Null)))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

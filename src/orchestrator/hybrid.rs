//! Hybrid mode: vector + LPG concept traversal, merged and reranked.

use crate::adapter::lpg::{InMemoryLpgAdapter, LpgNode};
use crate::adapter::traits::{ChunkHit, VectorAdapter, VectorFilters};
use crate::error::OrchestratorError;
use crate::llm::{ChatClient, ChatRequest};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

/// Cap on merged chunks forwarded into the answer-synthesis prompt, unless
/// the caller asks for fewer.
pub const DEFAULT_MAX_CONTEXT_CHUNKS: usize = 12;
const MAX_RELATIONS_PER_CLASS: usize = 3;
const MAX_KEY_RELATIONSHIPS: usize = 15;
const GRAPH_ONLY_SCORE: f32 = 0.6;
const OVERLAP_BONUS: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
    Vector,
    Graph,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: Option<usize>,
    pub text: String,
    pub score: f32,
    pub source: ChunkSource,
}

/// A concept-graph entity re-expressed as something content-mergeable with
/// vector hits. The
/// in-memory LPG doesn't track per-chunk provenance on a node, so a node's
/// first `source_doc_ids` entry stands in for its document.
struct GraphConceptHit {
    chunk_id: String,
    document_id: String,
    document_name: String,
    text: String,
}

fn concept_hits_from_nodes(nodes: &[LpgNode]) -> Vec<GraphConceptHit> {
    nodes
        .iter()
        .map(|n| {
            let doc_id = n
                .properties
                .get("source_doc_ids")
                .and_then(|v| v.as_array())
                .and_then(|a| a.first())
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            let name = n.properties.get("display_name").and_then(|v| v.as_str()).unwrap_or(&n.id).to_string();
            GraphConceptHit { chunk_id: format!("entity:{}", n.id), document_id: doc_id, document_name: name.clone(), text: format!("{name} ({})", n.label) }
        })
        .collect()
}

/// Merges vector hits and graph concept hits keyed by `chunk_id`: vector-only chunks keep their similarity score, graph-only
/// chunks score [`GRAPH_ONLY_SCORE`], and a key present on both sides gets
/// [`OVERLAP_BONUS`] added (capped at 1.0) and is marked `source: both`.
fn merge_chunks(vector_hits: Vec<ChunkHit>, graph_hits: Vec<GraphConceptHit>, max_context_chunks: usize) -> Vec<MergedChunk> {
    let mut by_key: BTreeMap<String, MergedChunk> = BTreeMap::new();
    for hit in vector_hits {
        by_key.insert(
            hit.chunk_id.clone(),
            MergedChunk {
                chunk_id: hit.chunk_id,
                document_id: hit.document_id.to_string(),
                document_name: hit.document_name,
                chunk_index: Some(hit.chunk_index),
                text: hit.text,
                score: hit.similarity,
                source: ChunkSource::Vector,
            },
        );
    }
    for hit in graph_hits {
        by_key
            .entry(hit.chunk_id.clone())
            .and_modify(|existing| {
                existing.score = (existing.score + OVERLAP_BONUS).min(1.0);
                existing.source = ChunkSource::Both;
            })
            .or_insert(MergedChunk {
                chunk_id: hit.chunk_id,
                document_id: hit.document_id,
                document_name: hit.document_name,
                chunk_index: None,
                text: hit.text,
                score: GRAPH_ONLY_SCORE,
                source: ChunkSource::Graph,
            });
    }
    let mut merged: Vec<MergedChunk> = by_key.into_values().collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(max_context_chunks);
    merged
}

fn node_display_name(node: &LpgNode) -> &str {
    node.properties.get("display_name").and_then(|v| v.as_str()).unwrap_or(&node.id)
}

/// Builds the structured context string fed to the answer-synthesis prompt
///: `RELEVANT DOCUMENT EXCERPTS`, `KNOWLEDGE GRAPH
/// CONTEXT` grouped by class with at most [`MAX_RELATIONS_PER_CLASS`]
/// relations each, and `KEY RELATIONSHIPS` with at most
/// [`MAX_KEY_RELATIONSHIPS`] unique `S --[P]--> O` lines.
pub fn build_context_string(merged_chunks: &[MergedChunk], nodes: &[LpgNode], relations: &[(String, String, String)]) -> String {
    let mut out = String::new();

    writeln!(out, "RELEVANT DOCUMENT EXCERPTS:").ok();
    if merged_chunks.is_empty() {
        writeln!(out, "  (none)").ok();
    }
    for (i, chunk) in merged_chunks.iter().enumerate() {
        writeln!(out, "{}. [{}] {}", i + 1, chunk.document_name, chunk.text).ok();
    }

    writeln!(out, "\nKNOWLEDGE GRAPH CONTEXT:").ok();
    let mut by_class: BTreeMap<&str, Vec<&LpgNode>> = BTreeMap::new();
    for node in nodes {
        by_class.entry(&node.label).or_default().push(node);
    }
    if by_class.is_empty() {
        writeln!(out, "  (none)").ok();
    }
    for (class, class_nodes) in &by_class {
        writeln!(out, "  {class}:").ok();
        let names: HashSet<&str> = class_nodes.iter().map(|n| node_display_name(n)).collect();
        for node in class_nodes {
            writeln!(out, "    - {}", node_display_name(node)).ok();
        }
        for (s, p, o) in relations.iter().filter(|(s, _, o)| names.contains(s.as_str()) || names.contains(o.as_str())).take(MAX_RELATIONS_PER_CLASS) {
            writeln!(out, "      {s} --[{p}]--> {o}").ok();
        }
    }

    writeln!(out, "\nKEY RELATIONSHIPS:").ok();
    let mut seen = HashSet::new();
    let mut emitted = 0;
    for (s, p, o) in relations {
        let line = format!("{s} --[{p}]--> {o}");
        if seen.insert(line.clone()) {
            writeln!(out, "  {line}").ok();
            emitted += 1;
            if emitted >= MAX_KEY_RELATIONSHIPS {
                break;
            }
        }
    }
    out
}

const GROUNDING_SYSTEM_PROMPT: &str =
    "Answer the user's question using only the supplied context. If the context does not contain the information needed, explicitly say so rather than guessing.";

#[derive(Debug, Clone)]
pub struct HybridResult {
    pub answer: String,
    pub key_terms: Vec<String>,
    pub merged_chunks: Vec<MergedChunk>,
    pub matched_nodes: Vec<LpgNode>,
    pub relations: Vec<(String, String, String)>,
}

/// Runs the full hybrid pipeline: term extraction, vector search, per-term
/// LPG concept lookup, merge/rerank, context assembly, answer synthesis.
#[allow(clippy::too_many_arguments)]
pub async fn run_hybrid(
    chat: &dyn ChatClient,
    vector: &dyn VectorAdapter,
    lpg: &InMemoryLpgAdapter,
    workspace_id: &str,
    question: &str,
    filters: &VectorFilters,
    top_k: usize,
    graph_depth: usize,
    max_context_chunks: usize,
) -> Result<HybridResult, OrchestratorError> {
    let key_terms = super::terms::extract_key_terms(chat, question).await;

    let vector_hits = vector.semantic_search(question, top_k, filters).await?;

    let mut matched_nodes: Vec<LpgNode> = Vec::new();
    let mut seen_node_ids = HashSet::new();
    for term in &key_terms {
        for node in lpg.concept_lookup(term, workspace_id, graph_depth.max(1)) {
            if seen_node_ids.insert(node.id.clone()) {
                matched_nodes.push(node);
            }
        }
    }

    let node_ids: Vec<String> = matched_nodes.iter().map(|n| n.id.clone()).collect();
    let relations = lpg.relations_touching(&node_ids);

    let graph_hits = concept_hits_from_nodes(&matched_nodes);
    let merged_chunks = merge_chunks(vector_hits, graph_hits, max_context_chunks);

    let context = build_context_string(&merged_chunks, &matched_nodes, &relations);
    let answer = chat
        .complete(&ChatRequest { system: GROUNDING_SYSTEM_PROMPT.to_string(), user: format!("Context:\n{context}\n\nQuestion: {question}") })
        .await?;

    Ok(HybridResult { answer, key_terms, merged_chunks, matched_nodes, relations })
}

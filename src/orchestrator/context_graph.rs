//! Context-graph enrichment: a small nodes/edges/statistics/
//! provenance snapshot attached to graph-bearing responses. Pure
//! presentation over data already fetched for the mode's own answer —
//! nothing here can fail the overall query.

use super::modes::{ContextGraph, ContextGraphProvenance, ContextGraphStatistics, Mode};
use crate::adapter::lpg::LpgNode;

fn node_to_value(node: &LpgNode) -> serde_json::Value {
    serde_json::json!({
        "id": node.id,
        "label": node.label,
        "properties": node.properties,
    })
}

fn edge_to_value(relation: &(String, String, String)) -> serde_json::Value {
    serde_json::json!({
        "source": relation.0,
        "relationship": relation.1,
        "target": relation.2,
    })
}

/// Builds the context-graph attachment from whatever nodes/relations the
/// mode already resolved. `mode` is recorded in `provenance.query_mode` so
/// a caller can tell compare/hybrid apart from a plain graph query.
pub fn build_context_graph(nodes: &[LpgNode], relations: &[(String, String, String)], mode: Mode) -> ContextGraph {
    let node_count = nodes.len();
    let edge_count = relations.len();
    let cardinality = if node_count == 0 { 0.0 } else { edge_count as f64 / node_count as f64 };

    ContextGraph {
        nodes: nodes.iter().map(node_to_value).collect(),
        edges: relations.iter().map(edge_to_value).collect(),
        statistics: ContextGraphStatistics { node_count, edge_count, cardinality },
        provenance: ContextGraphProvenance { query_mode: format!("{mode:?}").to_lowercase() },
    }
}

/// A short human-readable trace of how the answer was assembled, surfaced
/// alongside the context graph for callers that want to show their work.
pub fn reasoning_trace(mode: Mode, key_terms: &[String], node_count: usize, chunk_count: usize) -> Vec<String> {
    let mut trace = vec![format!("mode: {mode:?}")];
    if !key_terms.is_empty() {
        trace.push(format!("key terms: {}", key_terms.join(", ")));
    }
    if node_count > 0 {
        trace.push(format!("matched {node_count} graph entities"));
    }
    if chunk_count > 0 {
        trace.push(format!("retrieved {chunk_count} context chunks"));
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, label: &str) -> LpgNode {
        LpgNode { id: id.to_string(), label: label.to_string(), properties: serde_json::Map::new() }
    }

    #[test]
    fn empty_inputs_produce_zeroed_statistics() {
        let graph = build_context_graph(&[], &[], Mode::Hybrid);
        assert_eq!(graph.statistics.node_count, 0);
        assert_eq!(graph.statistics.cardinality, 0.0);
    }

    #[test]
    fn cardinality_is_edges_per_node() {
        let nodes = vec![node("n1", "Customer"), node("n2", "Order")];
        let relations = vec![("n1".to_string(), "PLACED".to_string(), "n2".to_string())];
        let graph = build_context_graph(&nodes, &relations, Mode::Graph);
        assert_eq!(graph.statistics.node_count, 2);
        assert_eq!(graph.statistics.edge_count, 1);
        assert_eq!(graph.statistics.cardinality, 0.5);
        assert_eq!(graph.provenance.query_mode, "graph");
    }

    #[test]
    fn reasoning_trace_includes_key_terms_when_present() {
        let trace = reasoning_trace(Mode::Hybrid, &["Acme".to_string()], 2, 3);
        assert!(trace.iter().any(|l| l.contains("Acme")));
        assert!(trace.iter().any(|l| l.contains("2 graph entities")));
    }
}

//! Resolve stage — MVP deterministic resolution.
//!
//! 1. Within the batch, merge nodes sharing `canonical_id` (keep the higher
//!    confidence, union `source_doc_ids`).
//! 2. For each surviving node, look up an existing LPG node with the same
//!    `display_name`/`tenant_id`/`workspace_id`/class but a *different*
//!    canonical_id; if found, rewrite the batch's canonical_id to the
//!    existing one everywhere it appears (edges, assertions, evidence
//!    references).
//! 3. Re-deduplicate after rewrites.
//!
//! Cross-document (step 2) resolution is best-effort: a lookup failure is
//! logged but does not fail the run.

use crate::adapter::{AdapterError, LpgAdapter};
use crate::ids::{CanonicalId, DocumentId};

#[derive(Debug, Clone)]
pub struct StagedNode {
    pub canonical_id: CanonicalId,
    pub class: String,
    pub display_name: String,
    pub confidence: f64,
    pub source_doc_ids: Vec<DocumentId>,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedBatch {
    pub nodes: Vec<StagedNode>,
    /// Maps an original canonical_id to the one it was rewritten to, for
    /// the caller to apply across edges/assertions/evidence links.
    pub rewrites: std::collections::HashMap<CanonicalId, CanonicalId>,
}

fn merge_within_batch(nodes: Vec<StagedNode>) -> Vec<StagedNode> {
    let mut by_id: std::collections::HashMap<CanonicalId, StagedNode> = std::collections::HashMap::new();
    for node in nodes {
        by_id
            .entry(node.canonical_id.clone())
            .and_modify(|existing| {
                if node.confidence > existing.confidence {
                    existing.confidence = node.confidence;
                    existing.display_name = node.display_name.clone();
                }
                for doc in &node.source_doc_ids {
                    if !existing.source_doc_ids.contains(doc) {
                        existing.source_doc_ids.push(doc.clone());
                    }
                }
            })
            .or_insert(node);
    }
    by_id.into_values().collect()
}

pub async fn resolve(
    lpg: &dyn LpgAdapter,
    tenant_id: &str,
    workspace_id: &str,
    staged: Vec<StagedNode>,
) -> ResolvedBatch {
    let merged = merge_within_batch(staged);
    let mut rewrites = std::collections::HashMap::new();
    let mut surviving = Vec::with_capacity(merged.len());

    for mut node in merged {
        match cross_document_lookup(lpg, tenant_id, workspace_id, &node).await {
            Ok(Some(existing_id)) if existing_id != node.canonical_id => {
                rewrites.insert(node.canonical_id.clone(), existing_id.clone());
                node.canonical_id = existing_id;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, node = %node.display_name, "cross-document resolution failed; keeping original canonical_id");
            }
        }
        surviving.push(node);
    }

    // Re-deduplicate: a rewrite may have collided two nodes onto the same
    // canonical_id.
    let nodes = merge_within_batch(surviving);
    ResolvedBatch { nodes, rewrites }
}

async fn cross_document_lookup(
    lpg: &dyn LpgAdapter,
    tenant_id: &str,
    workspace_id: &str,
    node: &StagedNode,
) -> Result<Option<CanonicalId>, AdapterError> {
    let cypher = format!(
        "MATCH (n:{} {{display_name: $display_name, tenant_id: $tenant_id, workspace_id: $workspace_id}}) RETURN n.canonical_id",
        node.class
    );
    let params = serde_json::json!({
        "display_name": node.display_name,
        "tenant_id": tenant_id,
        "workspace_id": workspace_id,
    });
    let rows = lpg.run_cypher(&cypher, &params).await?;
    for row in rows {
        if let Some(value) = row.0.first().and_then(|v| v.as_str()) {
            let candidate = CanonicalId::new(value.to_string());
            if candidate != node.canonical_id {
                return Ok(Some(candidate));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, confidence: f64) -> StagedNode {
        StagedNode { canonical_id: CanonicalId::new(id), class: "Person".into(), display_name: name.into(), confidence, source_doc_ids: vec![DocumentId::new("d1")] }
    }

    #[test]
    fn merge_keeps_higher_confidence_and_unions_docs() {
        let a = node("person_1", "Alice", 0.6);
        let mut b = node("person_1", "Alice", 0.9);
        b.source_doc_ids = vec![DocumentId::new("d2")];
        let merged = merge_within_batch(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.9);
        assert_eq!(merged[0].source_doc_ids.len(), 2);
    }

    #[tokio::test]
    async fn resolve_is_noop_when_lpg_has_no_match() {
        let lpg = crate::adapter::InMemoryLpgAdapter::new();
        let resolved = resolve(&lpg, "t1", "ws1", vec![node("person_1", "Alice", 0.9)]).await;
        assert_eq!(resolved.nodes.len(), 1);
        assert!(resolved.rewrites.is_empty());
    }
}

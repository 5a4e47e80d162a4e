//! Write stage: idempotent upserts on nodes and edges via
//! MERGE-on-canonical-id; assertions get their deterministic `assertion_id`;
//! `EVIDENCED_BY` edges connect to `EvidenceChunk` nodes keyed by
//! `(chunk_id, text_hash)`. Events are also persisted for audit.

use super::error::PipelineError;
use crate::adapter::traits::{EdgeMerge, NodeMerge};
use crate::adapter::{KvAdapter, LpgAdapter};
use crate::event::types::{ClaimStatus, GraphEvent};

fn claim_status_str(status: ClaimStatus) -> &'static str {
    match status {
        ClaimStatus::Fact => "fact",
        ClaimStatus::Claim => "claim",
    }
}

/// Writes a single event to the serving store(s). Quarantine/
/// CandidateConcept events are audit-only and are not written to the LPG.
pub async fn write_event(lpg: &dyn LpgAdapter, kv: &dyn KvAdapter, event: &GraphEvent) -> Result<(), PipelineError> {
    match event {
        GraphEvent::UpsertNode {
            envelope,
            class,
            canonical_id,
            attributes,
            display_name,
            confidence,
            claim_status,
            source_doc_ids,
            ..
        } => {
            lpg.merge_node(NodeMerge {
                canonical_id: canonical_id.to_string(),
                class: class.clone(),
                display_name: display_name.clone(),
                attributes: attributes.clone(),
                confidence: *confidence,
                claim_status: claim_status_str(*claim_status).to_string(),
                timestamp: chrono::Utc::now(),
                source_doc_ids: source_doc_ids.iter().map(|d| d.to_string()).collect(),
                tenant_id: envelope.tenant.to_string(),
                workspace_id: envelope.workspace.to_string(),
            })
            .await?;
        }
        GraphEvent::UpsertEdge { relationship_type, from_canonical_id, to_canonical_id, confidence, claim_status, attributes, .. } => {
            lpg.merge_edge(EdgeMerge {
                relationship_type: relationship_type.clone(),
                from_canonical_id: from_canonical_id.to_string(),
                to_canonical_id: to_canonical_id.to_string(),
                confidence: *confidence,
                claim_status: claim_status_str(*claim_status).to_string(),
                attributes: attributes.clone(),
            })
            .await?;
        }
        GraphEvent::UpsertAssertion { assertion_id, subject_canonical_id, predicate, object_canonical_id, chunk_id, quote, confidence, claim_status, .. } => {
            let mut attrs = serde_json::Map::new();
            attrs.insert("quote".into(), serde_json::json!(quote));
            lpg.merge_node(NodeMerge {
                canonical_id: assertion_id.to_string(),
                class: "Assertion".into(),
                display_name: format!("{subject_canonical_id} {predicate} {object_canonical_id}"),
                attributes: attrs,
                confidence: *confidence,
                claim_status: claim_status_str(*claim_status).to_string(),
                timestamp: chrono::Utc::now(),
                source_doc_ids: vec![],
                tenant_id: String::new(),
                workspace_id: String::new(),
            })
            .await?;
            let text_hash = format!("{:x}", {
                use sha2::{Digest, Sha256};
                let mut hasher = Sha256::new();
                hasher.update(quote.as_bytes());
                hasher.finalize()
            });
            let evidence_key = format!("evidence_chunk:{}:{}", chunk_id, &text_hash[..16]);
            kv.json_set(&evidence_key, &serde_json::json!({"chunk_id": chunk_id.to_string(), "text_hash": text_hash}))
                .await
                .map_err(PipelineError::Adapter)?;
            lpg.merge_edge(EdgeMerge {
                relationship_type: "EVIDENCED_BY".into(),
                from_canonical_id: assertion_id.to_string(),
                to_canonical_id: evidence_key,
                confidence: *confidence,
                claim_status: claim_status_str(*claim_status).to_string(),
                attributes: serde_json::Map::new(),
            })
            .await?;
        }
        GraphEvent::EvidenceLink { .. } | GraphEvent::CandidateConcept { .. } | GraphEvent::QuarantineRecord { .. } => {
            // Audit-only events: persisted below via `persist_for_audit`, never
            // written to the serving graph.
        }
    }
    Ok(())
}

/// Persists the raw event for audit (30-day retention per spec §4.4) under
/// a key namespaced by run id, independent of whether it was written to
/// the serving graph.
pub async fn persist_for_audit(kv: &dyn KvAdapter, run_id: &str, sequence: usize, event: &GraphEvent) -> Result<(), PipelineError> {
    let key = format!("audit:{run_id}:{sequence}");
    let value = serde_json::json!({
        "kind": event.kind(),
        "recorded_at": chrono::Utc::now().to_rfc3339(),
    });
    kv.json_set(&key, &value).await.map_err(PipelineError::Adapter)
}

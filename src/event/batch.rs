//! `GraphEventBatch` — events grouped per extraction run, with statistics
//! maintained incrementally as events are added, in the style
//! of the teacher's `EmitResult` (which accumulates committed/rejected
//! counts as an emission is processed rather than recomputing them).

use super::types::GraphEvent;
use crate::ids::{BatchId, ExtractionRunId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub nodes_upserted: usize,
    pub edges_upserted: usize,
    pub assertions_upserted: usize,
    pub evidence_links: usize,
    pub candidate_concepts: usize,
    pub quarantined: usize,
}

#[derive(Debug, Clone)]
pub struct GraphEventBatch {
    pub batch_id: BatchId,
    pub run: ExtractionRunId,
    pub stats: BatchStats,
    events: Vec<GraphEvent>,
}

impl GraphEventBatch {
    pub fn new(batch_id: BatchId, run: ExtractionRunId) -> Self {
        Self { batch_id, run, stats: BatchStats::default(), events: Vec::new() }
    }

    pub fn push(&mut self, event: GraphEvent) {
        match &event {
            GraphEvent::UpsertNode { .. } => self.stats.nodes_upserted += 1,
            GraphEvent::UpsertEdge { .. } => self.stats.edges_upserted += 1,
            GraphEvent::UpsertAssertion { .. } => self.stats.assertions_upserted += 1,
            GraphEvent::EvidenceLink { .. } => self.stats.evidence_links += 1,
            GraphEvent::CandidateConcept { .. } => self.stats.candidate_concepts += 1,
            GraphEvent::QuarantineRecord { .. } => self.stats.quarantined += 1,
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<GraphEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::types::{ClaimStatus, EventEnvelope};

    fn envelope() -> EventEnvelope {
        EventEnvelope {
            tenant: "t1".into(),
            workspace: "ws1".into(),
            ontology_version: "v1".into(),
            extraction_run: crate::ids::ExtractionRunId::new("run1"),
            source_type: "document".into(),
            source_id: "doc1".into(),
        }
    }

    #[test]
    fn stats_accumulate_incrementally() {
        let mut batch = GraphEventBatch::new(crate::ids::BatchId::new("b1"), crate::ids::ExtractionRunId::new("run1"));
        batch.push(GraphEvent::UpsertNode {
            envelope: envelope(),
            class: "Person".into(),
            canonical_id: "person_abc".into(),
            identity_keys: vec![],
            attributes: serde_json::Map::new(),
            display_name: "Alice".into(),
            confidence: 0.9,
            claim_status: ClaimStatus::Fact,
            status: "active".into(),
            source_doc_ids: vec![],
        });
        assert_eq!(batch.stats.nodes_upserted, 1);
        assert_eq!(batch.len(), 1);
    }
}

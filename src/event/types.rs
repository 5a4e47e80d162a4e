//! The six graph event types. Generalized from the teacher's
//! five low-level mutation-kind events to the extraction pipeline's
//! domain-meaningful event set; every variant still carries the same
//! scoping envelope the teacher's events carry (`adapter_id`/`context_id`
//! there, `tenant`/`workspace`/`ontology_version`/`extraction_run` here).

use crate::ids::{CanonicalId, ChunkId, DocumentId, ExtractionRunId, TenantId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Claim-status lattice: CLAIM < FACT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimStatus {
    Claim,
    Fact,
}

/// Fields common to every extraction-sourced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub tenant: TenantId,
    pub workspace: WorkspaceId,
    pub ontology_version: String,
    pub extraction_run: ExtractionRunId,
    pub source_type: String,
    pub source_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EvidenceTarget {
    Node { canonical_id: CanonicalId },
    Assertion { assertion_id: crate::ids::AssertionId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GraphEvent {
    UpsertNode {
        envelope: EventEnvelope,
        class: String,
        canonical_id: CanonicalId,
        identity_keys: Vec<(String, String)>,
        attributes: serde_json::Map<String, serde_json::Value>,
        display_name: String,
        confidence: f64,
        claim_status: ClaimStatus,
        status: String,
        source_doc_ids: Vec<DocumentId>,
    },
    UpsertEdge {
        envelope: EventEnvelope,
        relationship_type: String,
        from_canonical_id: CanonicalId,
        to_canonical_id: CanonicalId,
        from_class: String,
        to_class: String,
        confidence: f64,
        claim_status: ClaimStatus,
        extracted_at: chrono::DateTime<chrono::Utc>,
        attributes: serde_json::Map<String, serde_json::Value>,
    },
    UpsertAssertion {
        envelope: EventEnvelope,
        assertion_id: crate::ids::AssertionId,
        subject_canonical_id: CanonicalId,
        predicate: String,
        object_canonical_id: CanonicalId,
        chunk_id: ChunkId,
        span: (usize, usize),
        quote: String,
        confidence: f64,
        claim_status: ClaimStatus,
        method: String,
    },
    EvidenceLink {
        envelope: EventEnvelope,
        target: EvidenceTarget,
        chunk_id: ChunkId,
        document_id: DocumentId,
        span: (usize, usize),
        page: Option<u32>,
        section_path: Option<String>,
        quote: String,
        text_hash: String,
        confidence: f64,
        method: String,
    },
    CandidateConcept {
        envelope: EventEnvelope,
        term: String,
        suggested_class: String,
        suggested_definition: String,
        evidence_chunks: Vec<ChunkId>,
        frequency: u32,
    },
    QuarantineRecord {
        envelope: EventEnvelope,
        original_event: Box<GraphEvent>,
        failure_reason: String,
        validation_errors: Vec<String>,
        recoverable: bool,
        suggested_fix: Option<String>,
        confidence: f64,
    },
}

impl GraphEvent {
    pub fn envelope(&self) -> &EventEnvelope {
        match self {
            GraphEvent::UpsertNode { envelope, .. }
            | GraphEvent::UpsertEdge { envelope, .. }
            | GraphEvent::UpsertAssertion { envelope, .. }
            | GraphEvent::EvidenceLink { envelope, .. }
            | GraphEvent::CandidateConcept { envelope, .. }
            | GraphEvent::QuarantineRecord { envelope, .. } => envelope,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GraphEvent::UpsertNode { .. } => "upsert_node",
            GraphEvent::UpsertEdge { .. } => "upsert_edge",
            GraphEvent::UpsertAssertion { .. } => "upsert_assertion",
            GraphEvent::EvidenceLink { .. } => "evidence_link",
            GraphEvent::CandidateConcept { .. } => "candidate_concept",
            GraphEvent::QuarantineRecord { .. } => "quarantine_record",
        }
    }
}

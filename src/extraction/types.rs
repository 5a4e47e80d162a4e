//! Shared extraction-pipeline types.

use crate::ids::{ChunkId, DocumentId, ExtractionRunId, TenantId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Linear pipeline state machine, generalized from the
/// teacher's three-phase `PhaseStatus` to an explicit eight-state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Pending,
    Chunking,
    Classifying,
    Extracting,
    Validating,
    Resolving,
    Writing,
    Completed,
    Failed,
}

impl PipelineState {
    /// The only state each state is allowed to transition to. `None` means
    /// terminal.
    fn next(self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            Pending => Some(Chunking),
            Chunking => Some(Classifying),
            Classifying => Some(Extracting),
            Extracting => Some(Validating),
            Validating => Some(Resolving),
            Resolving => Some(Writing),
            Writing => Some(Completed),
            Completed | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    /// Advance to the next state in the linear order, or fail with
    /// `InvalidTransition` if `target` isn't the state's designated
    /// successor (or `Failed`, which is reachable from any non-terminal
    /// state).
    pub fn transition(self, target: PipelineState) -> Result<PipelineState, super::error::PipelineError> {
        if target == PipelineState::Failed && !self.is_terminal() {
            return Ok(PipelineState::Failed);
        }
        match self.next() {
            Some(expected) if expected == target => Ok(target),
            _ => Err(super::error::PipelineError::InvalidTransition { from: self, to: target }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub document_id: DocumentId,
    pub text: String,
    pub page_range: Option<(u32, u32)>,
    pub char_range: (usize, usize),
    pub heading_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentClassification {
    pub document_type: String,
    pub industry: String,
    pub topics: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub class: String,
    pub name: String,
    pub identity_attrs: Vec<(String, String)>,
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub display_name: String,
    pub confidence: f64,
    pub span: (usize, usize),
    pub quote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub relationship_type: String,
    pub subject_name: String,
    pub subject_class: String,
    pub object_name: String,
    pub object_class: String,
    pub confidence: f64,
    pub span: (usize, usize),
    pub quote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConceptCandidate {
    pub term: String,
    pub suggested_class: String,
    pub suggested_definition: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkExtraction {
    pub entities: Vec<ExtractedEntity>,
    pub relationships: Vec<ExtractedRelationship>,
    pub candidate_concepts: Vec<CandidateConceptCandidate>,
}

#[derive(Debug, Clone)]
pub struct ExtractionRun {
    pub run_id: ExtractionRunId,
    pub tenant: TenantId,
    pub workspace: WorkspaceId,
    pub document_id: DocumentId,
    pub ontology_version: String,
    pub state: PipelineState,
    pub errors: Vec<String>,
}

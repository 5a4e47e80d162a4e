//! Extraction pipeline: Parse&Chunk / Classify / Extract /
//! Validate / Resolve / Gate / Write, driven by [`pipeline::Pipeline`].

pub mod canonical;
pub mod chunk;
pub mod classify;
pub mod error;
pub mod extract;
pub mod gate;
pub mod pipeline;
pub mod resolve;
pub mod types;
pub mod validate;
pub mod write;

pub use canonical::{assertion_id, canonical_id};
pub use error::PipelineError;
pub use gate::{gate, GateDecision, CLAIM_THRESHOLD, FACT_THRESHOLD};
pub use pipeline::{Pipeline, PipelineInputs};
pub use types::{Chunk, ChunkExtraction, DocumentClassification, ExtractedEntity, ExtractedRelationship, ExtractionRun, PipelineState};

//! Pipeline driver: composes Parse&Chunk / Classify / Extract /
//! Validate / Resolve / Gate / Write into the linear state machine,
//! mirroring the teacher's phased `ExtractionCoordinator` but fully linear
//! and awaited (no background-task fan-out — the state machine here has
//! none to model).

use super::canonical::{assertion_id, canonical_id};
use super::error::PipelineError;
use super::gate::{gate, GateDecision};
use super::resolve::{resolve, StagedNode};
use super::types::{ExtractionRun, PipelineState};
use super::{chunk, classify, extract, validate};
use crate::adapter::{KvAdapter, LpgAdapter};
use crate::concurrency::CancellationToken;
use crate::event::batch::GraphEventBatch;
use crate::event::types::{EventEnvelope, EvidenceTarget, GraphEvent};
use crate::ids::{BatchId, CanonicalId, DocumentId, ExtractionRunId, TenantId, WorkspaceId};
use crate::llm::ChatClient;
use crate::ontology::schema::OntologySchema;

pub struct PipelineInputs<'a> {
    pub tenant: TenantId,
    pub workspace: WorkspaceId,
    pub document_id: DocumentId,
    pub document_text: String,
    pub ontology_version: String,
    pub schema: &'a OntologySchema,
}

pub struct Pipeline<'a> {
    pub chat: &'a dyn ChatClient,
    pub lpg: &'a dyn LpgAdapter,
    pub kv: &'a dyn KvAdapter,
    pub cancel: CancellationToken,
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

impl<'a> Pipeline<'a> {
    pub async fn run(&self, inputs: PipelineInputs<'a>) -> Result<(ExtractionRun, GraphEventBatch), PipelineError> {
        let run_id = ExtractionRunId::new(uuid::Uuid::new_v4().to_string());
        let mut run = ExtractionRun {
            run_id: run_id.clone(),
            tenant: inputs.tenant.clone(),
            workspace: inputs.workspace.clone(),
            document_id: inputs.document_id.clone(),
            ontology_version: inputs.ontology_version.clone(),
            state: PipelineState::Pending,
            errors: Vec::new(),
        };
        let mut batch = GraphEventBatch::new(BatchId::new(uuid::Uuid::new_v4().to_string()), run_id.clone());

        match self.run_inner(&inputs, &mut run, &mut batch).await {
            Ok(()) => {
                run.state = run.state.transition(PipelineState::Completed)?;
            }
            Err(err) => {
                run.state = PipelineState::Failed;
                run.errors.push(err.to_string());
                return Err(err);
            }
        }
        Ok((run, batch))
    }

    async fn run_inner(&self, inputs: &PipelineInputs<'a>, run: &mut ExtractionRun, batch: &mut GraphEventBatch) -> Result<(), PipelineError> {
        run.state = run.state.transition(PipelineState::Chunking)?;
        check_cancelled(&self.cancel)?;
        let chunks = chunk::parse_and_chunk(&inputs.document_id, &inputs.document_text, None);

        run.state = run.state.transition(PipelineState::Classifying)?;
        check_cancelled(&self.cancel)?;
        let sample: String = inputs.document_text.chars().take(2000).collect();
        let _classification = classify::classify_document(self.chat, &sample).await?;

        run.state = run.state.transition(PipelineState::Extracting)?;
        let mut extractions = Vec::with_capacity(chunks.len());
        for c in &chunks {
            check_cancelled(&self.cancel)?;
            extractions.push(extract::extract_chunk(self.chat, inputs.schema, c).await?);
        }

        run.state = run.state.transition(PipelineState::Validating)?;
        check_cancelled(&self.cancel)?;
        let envelope = |source_id: String| EventEnvelope {
            tenant: inputs.tenant.clone(),
            workspace: inputs.workspace.clone(),
            ontology_version: inputs.ontology_version.clone(),
            extraction_run: run.run_id.clone(),
            source_type: "document".to_string(),
            source_id,
        };

        let mut staged_nodes = Vec::new();
        let mut staged_events: Vec<GraphEvent> = Vec::new();

        for (c, extraction) in chunks.iter().zip(extractions.iter()) {
            for entity in &extraction.entities {
                match validate::validate_entity(inputs.schema, entity) {
                    validate::Outcome::Quarantine { reason, recoverable } => {
                        batch.push(quarantine(envelope(c.chunk_id.to_string()), reason, recoverable, None));
                    }
                    validate::Outcome::Valid { item, claim_status, confidence } => {
                        let cid = canonical_id(&item.class, &item.name, &item.identity_attrs);
                        staged_nodes.push(StagedNode {
                            canonical_id: cid.clone(),
                            class: item.class.clone(),
                            display_name: item.display_name.clone(),
                            confidence,
                            source_doc_ids: vec![inputs.document_id.clone()],
                        });
                        staged_events.push(GraphEvent::UpsertNode {
                            envelope: envelope(c.chunk_id.to_string()),
                            class: item.class.clone(),
                            canonical_id: cid.clone(),
                            identity_keys: item.identity_attrs.clone(),
                            attributes: item.attributes.clone(),
                            display_name: item.display_name.clone(),
                            confidence,
                            claim_status,
                            status: "active".to_string(),
                            source_doc_ids: vec![inputs.document_id.clone()],
                        });
                        staged_events.push(GraphEvent::EvidenceLink {
                            envelope: envelope(c.chunk_id.to_string()),
                            target: EvidenceTarget::Node { canonical_id: cid },
                            chunk_id: c.chunk_id.clone(),
                            document_id: inputs.document_id.clone(),
                            span: item.span,
                            page: None,
                            section_path: c.heading_path.clone(),
                            quote: item.quote.clone(),
                            text_hash: text_hash(&item.quote),
                            confidence,
                            method: "llm_extraction".to_string(),
                        });
                    }
                }
            }

            for rel in &extraction.relationships {
                match validate::validate_relationship(inputs.schema, rel) {
                    validate::Outcome::Quarantine { reason, recoverable } => {
                        batch.push(quarantine(envelope(c.chunk_id.to_string()), reason, recoverable, None));
                    }
                    validate::Outcome::Valid { item, claim_status, confidence } => {
                        let subject_id = canonical_id(&item.subject_class, &item.subject_name, &[]);
                        let object_id = canonical_id(&item.object_class, &item.object_name, &[]);
                        staged_events.push(GraphEvent::UpsertEdge {
                            envelope: envelope(c.chunk_id.to_string()),
                            relationship_type: item.relationship_type.clone(),
                            from_canonical_id: subject_id.clone(),
                            to_canonical_id: object_id.clone(),
                            from_class: item.subject_class.clone(),
                            to_class: item.object_class.clone(),
                            confidence,
                            claim_status,
                            extracted_at: chrono::Utc::now(),
                            attributes: serde_json::Map::new(),
                        });
                        let aid = assertion_id(subject_id.as_str(), &item.relationship_type, object_id.as_str(), c.chunk_id.as_str(), item.span.0, item.span.1);
                        staged_events.push(GraphEvent::UpsertAssertion {
                            envelope: envelope(c.chunk_id.to_string()),
                            assertion_id: aid.clone(),
                            subject_canonical_id: subject_id,
                            predicate: item.relationship_type.clone(),
                            object_canonical_id: object_id,
                            chunk_id: c.chunk_id.clone(),
                            span: item.span,
                            quote: item.quote.clone(),
                            confidence,
                            claim_status,
                            method: "llm_extraction".to_string(),
                        });
                        staged_events.push(GraphEvent::EvidenceLink {
                            envelope: envelope(c.chunk_id.to_string()),
                            target: EvidenceTarget::Assertion { assertion_id: aid },
                            chunk_id: c.chunk_id.clone(),
                            document_id: inputs.document_id.clone(),
                            span: item.span,
                            page: None,
                            section_path: c.heading_path.clone(),
                            quote: item.quote.clone(),
                            text_hash: text_hash(&item.quote),
                            confidence,
                            method: "llm_extraction".to_string(),
                        });
                    }
                }
            }

            for candidate in &extraction.candidate_concepts {
                staged_events.push(GraphEvent::CandidateConcept {
                    envelope: envelope(c.chunk_id.to_string()),
                    term: candidate.term.clone(),
                    suggested_class: candidate.suggested_class.clone(),
                    suggested_definition: candidate.suggested_definition.clone(),
                    evidence_chunks: vec![c.chunk_id.clone()],
                    frequency: candidate.frequency,
                });
            }
        }

        run.state = run.state.transition(PipelineState::Resolving)?;
        check_cancelled(&self.cancel)?;
        let resolved = resolve(self.lpg, inputs.tenant.as_str(), inputs.workspace.as_str(), staged_nodes).await;
        staged_events = apply_rewrites(staged_events, &resolved.rewrites);

        run.state = run.state.transition(PipelineState::Writing)?;
        for event in staged_events {
            check_cancelled(&self.cancel)?;
            let confidence = event_confidence(&event);
            match gate(confidence) {
                GateDecision::Write(_) => {
                    super::write::write_event(self.lpg, self.kv, &event).await?;
                    super::write::persist_for_audit(self.kv, run.run_id.as_str(), batch.len(), &event).await?;
                    batch.push(event);
                }
                GateDecision::Quarantine => {
                    let env = event.envelope().clone();
                    batch.push(quarantine(env, "confidence below threshold".to_string(), true, Some(event)));
                }
            }
        }

        Ok(())
    }
}

fn event_confidence(event: &GraphEvent) -> f64 {
    match event {
        GraphEvent::UpsertNode { confidence, .. }
        | GraphEvent::UpsertEdge { confidence, .. }
        | GraphEvent::UpsertAssertion { confidence, .. }
        | GraphEvent::EvidenceLink { confidence, .. } => *confidence,
        GraphEvent::CandidateConcept { .. } => 1.0,
        GraphEvent::QuarantineRecord { confidence, .. } => *confidence,
    }
}

fn quarantine(envelope: EventEnvelope, reason: String, recoverable: bool, original: Option<GraphEvent>) -> GraphEvent {
    let confidence = original.as_ref().map(event_confidence).unwrap_or(0.0);
    GraphEvent::QuarantineRecord {
        envelope,
        original_event: Box::new(original.unwrap_or(GraphEvent::CandidateConcept {
            envelope: EventEnvelope {
                tenant: "".into(),
                workspace: "".into(),
                ontology_version: String::new(),
                extraction_run: "".into(),
                source_type: String::new(),
                source_id: String::new(),
            },
            term: String::new(),
            suggested_class: String::new(),
            suggested_definition: String::new(),
            evidence_chunks: vec![],
            frequency: 0,
        })),
        failure_reason: reason.clone(),
        validation_errors: vec![reason],
        recoverable,
        suggested_fix: None,
        confidence,
    }
}

fn apply_rewrites(events: Vec<GraphEvent>, rewrites: &std::collections::HashMap<CanonicalId, CanonicalId>) -> Vec<GraphEvent> {
    if rewrites.is_empty() {
        return events;
    }
    let rewrite = |id: CanonicalId| rewrites.get(&id).cloned().unwrap_or(id);
    events
        .into_iter()
        .map(|event| match event {
            GraphEvent::UpsertNode { canonical_id, envelope, class, identity_keys, attributes, display_name, confidence, claim_status, status, source_doc_ids } => {
                GraphEvent::UpsertNode { canonical_id: rewrite(canonical_id), envelope, class, identity_keys, attributes, display_name, confidence, claim_status, status, source_doc_ids }
            }
            GraphEvent::UpsertEdge { envelope, relationship_type, from_canonical_id, to_canonical_id, from_class, to_class, confidence, claim_status, extracted_at, attributes } => {
                GraphEvent::UpsertEdge {
                    envelope,
                    relationship_type,
                    from_canonical_id: rewrite(from_canonical_id),
                    to_canonical_id: rewrite(to_canonical_id),
                    from_class,
                    to_class,
                    confidence,
                    claim_status,
                    extracted_at,
                    attributes,
                }
            }
            GraphEvent::UpsertAssertion { envelope, assertion_id, subject_canonical_id, predicate, object_canonical_id, chunk_id, span, quote, confidence, claim_status, method } => {
                GraphEvent::UpsertAssertion {
                    envelope,
                    assertion_id,
                    subject_canonical_id: rewrite(subject_canonical_id),
                    predicate,
                    object_canonical_id: rewrite(object_canonical_id),
                    chunk_id,
                    span,
                    quote,
                    confidence,
                    claim_status,
                    method,
                }
            }
            GraphEvent::EvidenceLink { envelope, target, chunk_id, document_id, span, page, section_path, quote, text_hash, confidence, method } => {
                let target = match target {
                    EvidenceTarget::Node { canonical_id } => EvidenceTarget::Node { canonical_id: rewrite(canonical_id) },
                    other => other,
                };
                GraphEvent::EvidenceLink { envelope, target, chunk_id, document_id, span, page, section_path, quote, text_hash, confidence, method }
            }
            other => other,
        })
        .collect()
}

fn text_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}


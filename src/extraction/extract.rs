//! Extract stage: one chat call per chunk, primed with allowed
//! classes/relationships/cardinalities, returning entities, relationships,
//! and candidate concepts.

use super::error::PipelineError;
use super::types::{Chunk, ChunkExtraction};
use crate::llm::{ChatClient, ChatRequest};
use crate::ontology::schema::OntologySchema;

fn build_priming_prompt(schema: &OntologySchema) -> String {
    let classes: Vec<String> = schema
        .classes
        .iter()
        .map(|c| {
            let props: Vec<String> = schema.data_properties_for(&c.name).iter().map(|p| format!("{}:{:?}", p.name, p.range)).collect();
            format!("{} [{}]", c.name, props.join(", "))
        })
        .collect();
    let relationships: Vec<String> = schema
        .object_properties
        .iter()
        .map(|r| format!("{} ({} -> {})", r.name, r.domain_class, r.range_class))
        .collect();
    format!(
        "Allowed classes:\n{}\n\nAllowed relationships:\n{}\n\n\
         Extract entities, relationships, and candidate concepts from the chunk as JSON: \
         {{\"entities\": [...], \"relationships\": [...], \"candidate_concepts\": [...]}}.",
        classes.join("\n"),
        relationships.join("\n"),
    )
}

pub async fn extract_chunk(chat: &dyn ChatClient, schema: &OntologySchema, chunk: &Chunk) -> Result<ChunkExtraction, PipelineError> {
    let system = build_priming_prompt(schema);
    let request = ChatRequest { system, user: chunk.text.clone() };
    let response = chat.complete(&request).await.map_err(|e| PipelineError::ChatFailed(e.to_string()))?;
    let json_text = crate::query_gen::repair::strip_markdown_fences(&response);
    serde_json::from_str(&json_text).map_err(|e| PipelineError::UnparseableOutput(format!("extract response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ChunkId, DocumentId};
    use crate::llm::MockChatClient;
    use crate::ontology::schema::{ClassDef, DataProperty, XsdType};

    fn schema() -> OntologySchema {
        OntologySchema {
            ontology_version: "v1".into(),
            classes: vec![ClassDef { name: "Person".into(), iri: "http://x/Person".into(), identity_attrs: vec!["name".into()] }],
            data_properties: vec![DataProperty { name: "name".into(), domain_class: "Person".into(), range: XsdType::String, required: true }],
            object_properties: vec![],
        }
    }

    fn chunk() -> Chunk {
        Chunk {
            chunk_id: ChunkId::new("doc1_chunk_0"),
            document_id: DocumentId::new("doc1"),
            text: "Alice works at Acme.".into(),
            page_range: None,
            char_range: (0, 20),
            heading_path: None,
        }
    }

    #[tokio::test]
    async fn extracts_entities_from_well_formed_response() {
        let chat = MockChatClient::available().with_default_response(
            r#"{"entities": [{"class": "Person", "name": "Alice", "identity_attrs": [], "attributes": {}, "display_name": "Alice", "confidence": 0.9, "span": [0, 5], "quote": "Alice"}], "relationships": [], "candidate_concepts": []}"#,
        );
        let result = extract_chunk(&chat, &schema(), &chunk()).await.unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "Alice");
    }
}

//! Classify stage: a single chat call yields
//! `{document_type, industry, topics, confidence}`, used only to pick an
//! ontology slice when one exists.

use super::error::PipelineError;
use super::types::DocumentClassification;
use crate::llm::{ChatClient, ChatRequest};

const SYSTEM_PROMPT: &str = "Classify the document. Respond with JSON only: \
{\"document_type\": string, \"industry\": string, \"topics\": [string], \"confidence\": number between 0 and 1}.";

pub async fn classify_document(chat: &dyn ChatClient, document_text_sample: &str) -> Result<DocumentClassification, PipelineError> {
    let request = ChatRequest { system: SYSTEM_PROMPT.to_string(), user: document_text_sample.to_string() };
    let response = chat.complete(&request).await.map_err(|e| PipelineError::ChatFailed(e.to_string()))?;
    let json_text = crate::query_gen::repair::strip_markdown_fences(&response);
    serde_json::from_str(&json_text).map_err(|e| PipelineError::UnparseableOutput(format!("classify response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    #[tokio::test]
    async fn parses_well_formed_classification() {
        let chat = MockChatClient::available().with_default_response(
            r#"{"document_type": "contract", "industry": "legal", "topics": ["lease"], "confidence": 0.92}"#,
        );
        let result = classify_document(&chat, "sample text").await.unwrap();
        assert_eq!(result.document_type, "contract");
        assert_eq!(result.topics, vec!["lease".to_string()]);
    }

    #[tokio::test]
    async fn strips_markdown_fences_before_parsing() {
        let chat = MockChatClient::available().with_default_response(
            "```json\n{\"document_type\": \"invoice\", \"industry\": \"finance\", \"topics\": [], \"confidence\": 0.5}\n```",
        );
        let result = classify_document(&chat, "sample text").await.unwrap();
        assert_eq!(result.document_type, "invoice");
    }

    #[tokio::test]
    async fn unparseable_response_errors() {
        let chat = MockChatClient::available().with_default_response("not json");
        let err = classify_document(&chat, "x").await.unwrap_err();
        assert!(matches!(err, PipelineError::UnparseableOutput(_)));
    }
}

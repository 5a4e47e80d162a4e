//! NL -> SPARQL synthesis, repair, and the execute-with-one-retry loop
//!.

use super::error::GenerationError;
use super::priming::build_sparql_priming;
use super::repair::repair_sparql;
use crate::adapter::traits::{GraphType, SparqlOptions, SparqlResult, TriplestoreAdapter};
use crate::ids::{TenantId, WorkspaceId};
use crate::llm::{ChatClient, ChatRequest};
use crate::ontology::schema::OntologySchema;

fn build_prompt(schema: &OntologySchema, sample_rows: &[serde_json::Value], question: &str) -> ChatRequest {
    let priming = build_sparql_priming(schema, sample_rows);
    ChatRequest {
        system: format!(
            "You translate natural-language questions into a single read-only SPARQL query against the following ontology.\n{priming}\nReturn only the SPARQL query, no commentary."
        ),
        user: question.to_string(),
    }
}

/// Synthesizes and repairs a SPARQL query from `question`. Returns
/// [`GenerationError::NoExecutableQuery`] if the model produced nothing, or
/// [`GenerationError::RejectedQuery`] if repair couldn't turn the response
/// into an executable read-only query.
pub async fn synthesize_sparql(
    chat: &dyn ChatClient,
    schema: &OntologySchema,
    sample_rows: &[serde_json::Value],
    question: &str,
) -> Result<String, GenerationError> {
    let request = build_prompt(schema, sample_rows, question);
    let raw = chat.complete(&request).await?;
    if raw.trim().is_empty() {
        return Err(GenerationError::NoExecutableQuery("chat model returned an empty response".to_string()));
    }
    repair_sparql(&raw).map_err(GenerationError::RejectedQuery)
}

/// Runs `synthesize_sparql`, executes it against the triplestore, and on
/// execution failure resubmits the error plus original query and schema for
/// one self-repair attempt.
/// A second failure returns [`GenerationError::ExecutionFailed`] carrying
/// the last attempted query text.
#[allow(clippy::too_many_arguments)]
pub async fn execute_sparql_with_repair(
    chat: &dyn ChatClient,
    triplestore: &dyn TriplestoreAdapter,
    tenant: &TenantId,
    workspace: &WorkspaceId,
    schema: &OntologySchema,
    sample_rows: &[serde_json::Value],
    graph_type: GraphType,
    options: &SparqlOptions,
    question: &str,
) -> Result<SparqlResult, GenerationError> {
    let query = synthesize_sparql(chat, schema, sample_rows, question).await?;
    match triplestore.execute_sparql(tenant, workspace, &query, graph_type, options).await {
        Ok(result) => Ok(result),
        Err(first_err) => {
            let priming = build_sparql_priming(schema, sample_rows);
            let repair_request = ChatRequest {
                system: format!(
                    "The previous SPARQL query failed to execute against this ontology:\n{priming}\nCorrect the query. Return only the corrected SPARQL, no commentary."
                ),
                user: format!("Original query:\n{query}\n\nError:\n{first_err}"),
            };
            let raw = chat.complete(&repair_request).await?;
            let corrected = repair_sparql(&raw).map_err(|reason| GenerationError::ExecutionFailed {
                attempted_query: query.clone(),
                message: reason,
            })?;
            triplestore.execute_sparql(tenant, workspace, &corrected, graph_type, options).await.map_err(|second_err| {
                GenerationError::ExecutionFailed { attempted_query: corrected, message: second_err.to_string() }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::error::AdapterError;
    use crate::llm::MockChatClient;
    use crate::ontology::schema::{ClassDef, DataProperty, XsdType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails its first `execute_sparql` call, then succeeds, so the repair
    /// loop's retry path can be exercised deterministically.
    struct FlakyTriplestore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TriplestoreAdapter for FlakyTriplestore {
        async fn execute_sparql(
            &self,
            _tenant: &TenantId,
            _workspace: &WorkspaceId,
            _query: &str,
            _graph_type: GraphType,
            _options: &SparqlOptions,
        ) -> Result<SparqlResult, AdapterError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(AdapterError::BackendStatus { status: 400, body: "malformed query".into() });
            }
            Ok(SparqlResult::default())
        }

        async fn import_turtle(&self, _graph_iri: &str, _turtle: &str) -> Result<usize, AdapterError> {
            unimplemented!()
        }

        async fn count_triples_in_graph(&self, _graph_iri: &str) -> Result<u64, AdapterError> {
            unimplemented!()
        }

        async fn create_named_graph(&self, _graph_iri: &str) -> Result<(), AdapterError> {
            unimplemented!()
        }

        async fn drop_named_graph(&self, _graph_iri: &str) -> Result<(), AdapterError> {
            unimplemented!()
        }

        async fn list_ontologies(&self, _scope: GraphType) -> Result<Vec<String>, AdapterError> {
            unimplemented!()
        }
    }

    fn sample_schema() -> OntologySchema {
        OntologySchema {
            ontology_version: "v1".into(),
            classes: vec![ClassDef { name: "Customer".into(), iri: "http://x/Customer".into(), identity_attrs: vec!["name".into()] }],
            data_properties: vec![DataProperty {
                name: "riskScore".into(),
                domain_class: "Customer".into(),
                range: XsdType::Decimal,
                required: false,
            }],
            object_properties: vec![],
        }
    }

    #[tokio::test]
    async fn synthesize_sparql_strips_fences_and_repairs_limit() {
        let chat = MockChatClient::available();
        chat.push_response("```sparql\nSELECT ?c WHERE { ?c a <http://x/Customer> LIMIT 5 }\n```").await;
        let schema = sample_schema();
        let query = synthesize_sparql(&chat, &schema, &[], "top 5 customers").await.unwrap();
        assert!(query.trim_end().ends_with("LIMIT 5"));
        assert!(!query.contains("```"));
    }

    #[tokio::test]
    async fn empty_response_is_no_executable_query() {
        let chat = MockChatClient::available();
        chat.push_response("").await;
        let schema = sample_schema();
        let err = synthesize_sparql(&chat, &schema, &[], "anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::NoExecutableQuery(_)));
    }

    #[tokio::test]
    async fn delete_query_is_rejected() {
        let chat = MockChatClient::available();
        chat.push_response("DELETE WHERE { ?s ?p ?o }").await;
        let schema = sample_schema();
        let err = synthesize_sparql(&chat, &schema, &[], "anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::RejectedQuery(_)));
    }

    #[tokio::test]
    async fn execute_with_repair_recovers_after_first_failure() {
        let triplestore = FlakyTriplestore { calls: AtomicUsize::new(0) };
        let chat = MockChatClient::available();
        chat.push_response("SELECT ?s WHERE { ?s ?p ?o }").await;
        chat.push_response("SELECT ?s WHERE { ?s ?p ?o } LIMIT 10").await;
        let schema = sample_schema();
        let tenant = TenantId::from("t1");
        let workspace = WorkspaceId::from("w1");
        let result = execute_sparql_with_repair(
            &chat,
            &triplestore,
            &tenant,
            &workspace,
            &schema,
            &[],
            GraphType::Data,
            &SparqlOptions::default(),
            "anything",
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(triplestore.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn execute_with_repair_surfaces_structured_failure_after_second_attempt() {
        struct AlwaysFails;
        #[async_trait]
        impl TriplestoreAdapter for AlwaysFails {
            async fn execute_sparql(
                &self,
                _tenant: &TenantId,
                _workspace: &WorkspaceId,
                _query: &str,
                _graph_type: GraphType,
                _options: &SparqlOptions,
            ) -> Result<SparqlResult, AdapterError> {
                Err(AdapterError::BackendStatus { status: 400, body: "still broken".into() })
            }
            async fn import_turtle(&self, _graph_iri: &str, _turtle: &str) -> Result<usize, AdapterError> {
                unimplemented!()
            }
            async fn count_triples_in_graph(&self, _graph_iri: &str) -> Result<u64, AdapterError> {
                unimplemented!()
            }
            async fn create_named_graph(&self, _graph_iri: &str) -> Result<(), AdapterError> {
                unimplemented!()
            }
            async fn drop_named_graph(&self, _graph_iri: &str) -> Result<(), AdapterError> {
                unimplemented!()
            }
            async fn list_ontologies(&self, _scope: GraphType) -> Result<Vec<String>, AdapterError> {
                unimplemented!()
            }
        }

        let triplestore = AlwaysFails;
        let chat = MockChatClient::available().with_default_response("SELECT ?s WHERE { ?s ?p ?o }");
        let schema = sample_schema();
        let tenant = TenantId::from("t1");
        let workspace = WorkspaceId::from("w1");
        let err = execute_sparql_with_repair(
            &chat,
            &triplestore,
            &tenant,
            &workspace,
            &schema,
            &[],
            GraphType::Data,
            &SparqlOptions::default(),
            "anything",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenerationError::ExecutionFailed { .. }));
    }
}

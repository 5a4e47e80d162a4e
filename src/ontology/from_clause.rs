//! FROM-clause composer.

use super::error::OntologyError;
use super::iri::{audit_graph_iri, data_graph_iri, deprecated_graph_iri, global_ontology_iri, tenant_ontology_iri, workspace_ontology_iri};
use crate::ids::{OntologyId, TenantId, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphQueryType {
    Ontology,
    Data,
}

#[derive(Debug, Clone)]
pub struct FromClauseRequest {
    pub graph_type: GraphQueryType,
    pub tenant: TenantId,
    pub workspace: WorkspaceId,
    pub ontology_id: OntologyId,
    pub include_global: bool,
    pub include_tenant: bool,
    pub include_workspace: bool,
    pub specific_graphs: Vec<String>,
    pub additional_workspaces: Vec<WorkspaceId>,
    pub vkg_graph_pattern: Option<String>,
}

/// Produces an ordered, deduplicated set of `FROM <iri>` clauses. Data-graph
/// queries always also include the deprecated and audit graphs.
pub fn compose_from_clauses(req: &FromClauseRequest) -> Result<Vec<String>, OntologyError> {
    let mut seen = std::collections::HashSet::new();
    let mut iris = Vec::new();
    let mut push = |iri: String, seen: &mut std::collections::HashSet<String>, iris: &mut Vec<String>| {
        if seen.insert(iri.clone()) {
            iris.push(iri);
        }
    };

    if req.include_global {
        push(global_ontology_iri(&req.ontology_id)?, &mut seen, &mut iris);
    }
    if req.include_tenant {
        push(tenant_ontology_iri(&req.tenant, &req.ontology_id)?, &mut seen, &mut iris);
    }
    if req.include_workspace {
        push(workspace_ontology_iri(&req.tenant, &req.workspace, &req.ontology_id)?, &mut seen, &mut iris);
    }

    if req.graph_type == GraphQueryType::Data {
        push(data_graph_iri(&req.tenant, &req.workspace)?, &mut seen, &mut iris);
        for ws in &req.additional_workspaces {
            push(data_graph_iri(&req.tenant, ws)?, &mut seen, &mut iris);
        }
        push(deprecated_graph_iri(&req.tenant, &req.workspace)?, &mut seen, &mut iris);
        push(audit_graph_iri(&req.tenant, &req.workspace)?, &mut seen, &mut iris);
    }

    for g in &req.specific_graphs {
        push(g.clone(), &mut seen, &mut iris);
    }
    if let Some(pattern) = &req.vkg_graph_pattern {
        push(pattern.clone(), &mut seen, &mut iris);
    }

    Ok(iris.into_iter().map(|iri| format!("FROM <{iri}>")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> FromClauseRequest {
        FromClauseRequest {
            graph_type: GraphQueryType::Data,
            tenant: TenantId::new("t1"),
            workspace: WorkspaceId::new("ws1"),
            ontology_id: OntologyId::new("onto1"),
            include_global: false,
            include_tenant: false,
            include_workspace: false,
            specific_graphs: vec![],
            additional_workspaces: vec![],
            vkg_graph_pattern: None,
        }
    }

    #[test]
    fn data_queries_always_include_deprecated_and_audit() {
        let clauses = compose_from_clauses(&base_request()).unwrap();
        assert!(clauses.iter().any(|c| c.contains("/deprecated")));
        assert!(clauses.iter().any(|c| c.contains("/audit")));
    }

    #[test]
    fn duplicate_graphs_are_deduplicated_preserving_order() {
        let mut req = base_request();
        req.specific_graphs = vec!["http://x/data".to_string(), "http://x/data".to_string()];
        let clauses = compose_from_clauses(&req).unwrap();
        let count = clauses.iter().filter(|c| c.contains("http://x/data")).count();
        assert_eq!(count, 1);
    }
}

//! Named-graph IRI builders.
//!
//! Pure, deterministic functions — no I/O, no clock, no randomness — over
//! the same base authority. Grounded on the teacher's preference for pure
//! builder functions ahead of stateful construction (`graph::node`'s
//! `NodeId::new` is the one place it reaches for randomness; everything
//! else about node/edge shape is computed from inputs).

use super::error::OntologyError;
use crate::ids::{OntologyId, TenantId, WorkspaceId};
use sha2::{Digest, Sha256};

const BASE: &str = "http://purplefabric.ai/graphs";

fn check(component: &str) -> Result<(), OntologyError> {
    if crate::ids::is_blank_or_undefined(component) {
        return Err(OntologyError::InvalidComponent(component.to_string()));
    }
    Ok(())
}

pub fn global_ontology_iri(ontology_id: &OntologyId) -> Result<String, OntologyError> {
    check(ontology_id.as_str())?;
    Ok(format!("{BASE}/global/ontology/{}", ontology_id))
}

pub fn tenant_ontology_iri(tenant: &TenantId, ontology_id: &OntologyId) -> Result<String, OntologyError> {
    check(tenant.as_str())?;
    check(ontology_id.as_str())?;
    Ok(format!("{BASE}/tenant/{}/ontology/{}", tenant, ontology_id))
}

pub fn workspace_ontology_iri(tenant: &TenantId, workspace: &WorkspaceId, ontology_id: &OntologyId) -> Result<String, OntologyError> {
    check(tenant.as_str())?;
    check(workspace.as_str())?;
    check(ontology_id.as_str())?;
    Ok(format!("{BASE}/tenant/{}/workspace/{}/ontology/{}", tenant, workspace, ontology_id))
}

pub fn data_graph_iri(tenant: &TenantId, workspace: &WorkspaceId) -> Result<String, OntologyError> {
    check(tenant.as_str())?;
    check(workspace.as_str())?;
    Ok(format!("{BASE}/tenant/{}/workspace/{}/data", tenant, workspace))
}

pub fn audit_graph_iri(tenant: &TenantId, workspace: &WorkspaceId) -> Result<String, OntologyError> {
    check(tenant.as_str())?;
    check(workspace.as_str())?;
    Ok(format!("{BASE}/tenant/{}/workspace/{}/audit", tenant, workspace))
}

pub fn deprecated_graph_iri(tenant: &TenantId, workspace: &WorkspaceId) -> Result<String, OntologyError> {
    check(tenant.as_str())?;
    check(workspace.as_str())?;
    Ok(format!("{BASE}/tenant/{}/workspace/{}/deprecated", tenant, workspace))
}

/// Total extraction of an ontology id from an arbitrary IRI:
/// try the fragment, then the `/ontology/{id}` path segment, then the last
/// path segment, else hash the whole IRI. Never panics, never returns
/// `None` — always yields *some* id.
pub fn extract_ontology_id(iri: &str) -> String {
    if let Some((_, fragment)) = iri.rsplit_once('#') {
        if !fragment.is_empty() {
            return fragment.to_string();
        }
    }
    if let Some(idx) = iri.find("/ontology/") {
        let rest = &iri[idx + "/ontology/".len()..];
        let id = rest.split('/').next().unwrap_or("");
        if !id.is_empty() {
            return id.to_string();
        }
    }
    if let Some(last) = iri.trim_end_matches('/').rsplit('/').next() {
        if !last.is_empty() {
            return last.to_string();
        }
    }
    let mut hasher = Sha256::new();
    hasher.update(iri.as_bytes());
    format!("hash_{:x}", hasher.finalize())[..24].to_string()
}

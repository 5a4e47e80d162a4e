//! Cross-workspace access control.
//!
//! Spec §9 flags the original's cross-workspace ACL check as a stub that a
//! real deployment must treat as a required integration point, not a
//! no-op. The FROM-clause composer and agent-level "additional workspaces"
//! fan-out both reach across workspace boundaries; this trait is the seam a
//! deployment wires a real policy store into. [`AllowAllAcl`] is the
//! explicit, documented stand-in used by the in-memory adapters and tests —
//! it is permissive by declaration, not by omission.

use crate::adapter::error::AdapterError;
use crate::ids::{TenantId, WorkspaceId};
use async_trait::async_trait;

#[async_trait]
pub trait CrossWorkspaceAcl: Send + Sync {
    /// Whether `from` may read data scoped to `to` within `tenant`.
    async fn allow(&self, tenant: &TenantId, from: &WorkspaceId, to: &WorkspaceId) -> Result<bool, AdapterError>;
}

/// Always permits cross-workspace reads within the same tenant. Documented
/// stand-in, not a production policy — see module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAcl;

#[async_trait]
impl CrossWorkspaceAcl for AllowAllAcl {
    async fn allow(&self, _tenant: &TenantId, _from: &WorkspaceId, _to: &WorkspaceId) -> Result<bool, AdapterError> {
        Ok(true)
    }
}

/// Filters `candidates` down to the workspaces `from` is permitted to read
/// alongside its own, preserving order.
pub async fn filter_allowed_workspaces(
    acl: &dyn CrossWorkspaceAcl,
    tenant: &TenantId,
    from: &WorkspaceId,
    candidates: &[WorkspaceId],
) -> Result<Vec<WorkspaceId>, AdapterError> {
    let mut allowed = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if acl.allow(tenant, from, candidate).await? {
            allowed.push(candidate.clone());
        }
    }
    Ok(allowed)
}

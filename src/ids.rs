//! Shared identifier newtypes
//!
//! Plain string newtypes in the teacher's `NodeId`/`EdgeId` style: transparent
//! serde representation, cheap `Display`/`From<&str>`/`From<String>` impls.
//! Poka-yoke against mixing up a tenant id with a workspace id at a call site.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(TenantId, "Tenant identifier");
string_id!(WorkspaceId, "Workspace identifier, scoped within a tenant");
string_id!(AgentId, "Agent identifier, scoped within (tenant, workspace)");
string_id!(UserId, "User identifier");
string_id!(SessionId, "Chat session identifier, scoped within (agent, user)");
string_id!(DocumentId, "Document identifier");
string_id!(ChunkId, "Chunk identifier, stable as `{doc}_chunk_{i}`");
string_id!(FolderId, "Folder identifier");
string_id!(OntologyId, "Ontology identifier");
string_id!(CanonicalId, "Deterministic canonical entity ID");
string_id!(AssertionId, "Deterministic reified-assertion ID");
string_id!(MemoryId, "Memory record identifier");
string_id!(ExtractionRunId, "Extraction pipeline run identifier");
string_id!(BatchId, "Graph event batch identifier");

/// A (tenant, workspace) scope pair — the unit most store operations are
/// partitioned by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub tenant: TenantId,
    pub workspace: WorkspaceId,
}

impl Scope {
    pub fn new(tenant: impl Into<TenantId>, workspace: impl Into<WorkspaceId>) -> Self {
        Self { tenant: tenant.into(), workspace: workspace.into() }
    }

    /// True if either component is empty or the literal string "undefined"
    ///.
    pub fn is_invalid(&self) -> bool {
        is_blank_or_undefined(self.tenant.as_str()) || is_blank_or_undefined(self.workspace.as_str())
    }
}

pub(crate) fn is_blank_or_undefined(s: &str) -> bool {
    s.is_empty() || s == "undefined"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_detects_blank_components() {
        assert!(Scope::new("", "ws1").is_invalid());
        assert!(Scope::new("t1", "").is_invalid());
        assert!(Scope::new("t1", "undefined").is_invalid());
        assert!(!Scope::new("t1", "ws1").is_invalid());
    }

    #[test]
    fn ids_roundtrip_display() {
        let id = TenantId::new("acme");
        assert_eq!(id.to_string(), "acme");
        assert_eq!(id.as_str(), "acme");
    }
}

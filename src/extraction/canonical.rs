//! Canonical & assertion ID functions.
//!
//! Pure and stable across runs/processes: no clock, no randomness, no
//! environment dependence. Hashing via `sha2`, grounded on the
//! `OntologyId`/`QueryCacheKey` hashing pattern seen in the wider retrieval
//! pack (see DESIGN.md) since the teacher repo itself has no canonical-ID
//! concept of its own.

use crate::ids::{AssertionId, CanonicalId};
use sha2::{Digest, Sha256};

/// `canonical_id(class, name, identity_attrs)` = `lower(class) + "_" +`
/// first 16 hex chars of `sha256("class|name|k1:v1|k2:v2|...")` with keys
/// sorted.
pub fn canonical_id(class: &str, name: &str, identity_attrs: &[(String, String)]) -> CanonicalId {
    let mut sorted = identity_attrs.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let mut parts = vec![class.to_string(), name.to_string()];
    parts.extend(sorted.iter().map(|(k, v)| format!("{k}:{v}")));
    let input = parts.join("|");

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    CanonicalId::new(format!("{}_{}", class.to_lowercase(), &hex[..16]))
}

/// `assertion_id(subject_id, predicate, object_id, chunk_id, span_start, span_end)`
/// = `"assertion_" +` first 20 hex chars of sha256 of the pipe-joined fields.
pub fn assertion_id(subject_id: &str, predicate: &str, object_id: &str, chunk_id: &str, span_start: usize, span_end: usize) -> AssertionId {
    let input = format!("{subject_id}|{predicate}|{object_id}|{chunk_id}|{span_start}|{span_end}");
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    AssertionId::new(format!("assertion_{}", &hex[..20]))
}

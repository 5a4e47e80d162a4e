//! `ChangeEvent` — the serialized form of one detected change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Insert => "INSERT",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        }
    }
}

/// One detected change to a single (entity, predicate) pair, carrying
/// everything required to serialize the required predicates on every
/// ChangeEvent: `rdf:type pf:ChangeEvent`, `pf:entity`,
/// `pf:property`, `pf:changeType`, `pf:changedAt`, `pf:sourceDocument`, plus
/// conditional `pf:previousValue`/`pf:newValue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_uri: String,
    pub entity_uri: String,
    pub property: String,
    pub change_type: ChangeType,
    pub changed_at: DateTime<Utc>,
    pub source_document: String,
    /// Present for UPDATE/DELETE.
    pub previous_value: Option<String>,
    /// Present for INSERT/UPDATE.
    pub new_value: Option<String>,
}

impl ChangeEvent {
    /// Serializes this event as N-Triples-ish lines sharing `event_uri` as
    /// subject, using the vocab from `ontology::vocab`.
    pub fn to_triples(&self) -> Vec<(String, String, String)> {
        use crate::ontology::vocab::*;
        let mut triples = vec![
            (self.event_uri.clone(), "rdf:type".to_string(), PF_CHANGE_EVENT.to_string()),
            (self.event_uri.clone(), PF_ENTITY.to_string(), self.entity_uri.clone()),
            (self.event_uri.clone(), PF_PROPERTY.to_string(), self.property.clone()),
            (self.event_uri.clone(), PF_CHANGE_TYPE.to_string(), self.change_type.as_str().to_string()),
            (self.event_uri.clone(), PF_CHANGED_AT.to_string(), self.changed_at.to_rfc3339()),
            (self.event_uri.clone(), PF_SOURCE_DOCUMENT.to_string(), self.source_document.clone()),
        ];
        if let Some(prev) = &self.previous_value {
            triples.push((self.event_uri.clone(), PF_PREVIOUS_VALUE.to_string(), prev.clone()));
        }
        if let Some(new) = &self.new_value {
            triples.push((self.event_uri.clone(), PF_NEW_VALUE.to_string(), new.clone()));
        }
        triples
    }
}

//! Diff engine: compares an entity's existing triples against a new set and
//! emits `ChangeEvent`s.

use super::change_event::{ChangeEvent, ChangeType};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One observed (predicate, value) pair for an entity, on either side of
/// the diff. `value_type` is carried through unchanged but not otherwise
/// used by the comparison, which is purely on the string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTriple {
    pub predicate: String,
    pub value: String,
    pub value_type: String,
}

/// Entity URI -> its observed triples, the shape both the "existing" and
/// "new" sides of a diff take.
pub type EntityTripleMap = HashMap<String, Vec<ObservedTriple>>;

/// Computes the change set between `old` and `new` for every (entity,
/// predicate) pair that appears in either map. Only the *last* value per
/// (entity, predicate) on each side is compared — a predicate repeated with
/// multiple values in one snapshot collapses to its final occurrence,
/// matching a last-writer-wins read of either side.
///
/// One `ChangeEvent` is produced per differing pair:
/// - present only in `new` => INSERT(previousValue="", newValue=...)
/// - present only in `old` => DELETE(previousValue=..., newValue="")
/// - present in both with a different value => UPDATE(previousValue=old, newValue=new)
/// - otherwise => no event
pub fn diff(old: &EntityTripleMap, new: &EntityTripleMap, audit_graph_iri: &str, source_document: &str, changed_at: DateTime<Utc>) -> Vec<ChangeEvent> {
    let mut entities: Vec<&String> = old.keys().chain(new.keys()).collect();
    entities.sort();
    entities.dedup();

    let mut events = Vec::new();
    for entity in entities {
        let old_props = last_value_per_predicate(old.get(entity));
        let new_props = last_value_per_predicate(new.get(entity));

        let mut predicates: Vec<&String> = old_props.keys().chain(new_props.keys()).collect();
        predicates.sort();
        predicates.dedup();

        for predicate in predicates {
            let old_value = old_props.get(predicate);
            let new_value = new_props.get(predicate);
            let change_type = match (old_value, new_value) {
                (None, Some(_)) => ChangeType::Insert,
                (Some(_), None) => ChangeType::Delete,
                (Some(o), Some(n)) if o != n => ChangeType::Update,
                _ => continue,
            };
            events.push(ChangeEvent {
                event_uri: format!("{audit_graph_iri}/event/{}", uuid::Uuid::new_v4()),
                entity_uri: entity.clone(),
                property: predicate.clone(),
                change_type,
                changed_at,
                source_document: source_document.to_string(),
                previous_value: old_value.map(|v| v.to_string()),
                new_value: new_value.map(|v| v.to_string()),
            });
        }
    }
    events
}

fn last_value_per_predicate(triples: Option<&Vec<ObservedTriple>>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(triples) = triples {
        for t in triples {
            map.insert(t.predicate.clone(), t.value.clone());
        }
    }
    map
}

/// Default audit-write batch size.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Splits a change event list into batches of at most `batch_size`
/// *triples* (not events) — an event can serialize to up to 8 triples, so
/// a batch never splits a single event's triples across two batches.
pub fn batch_triples(events: &[ChangeEvent], batch_size: usize) -> Vec<Vec<(String, String, String)>> {
    let mut batches = Vec::new();
    let mut current = Vec::new();
    for event in events {
        let triples = event.to_triples();
        if !current.is_empty() && current.len() + triples.len() > batch_size {
            batches.push(std::mem::take(&mut current));
        }
        current.extend(triples);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(predicate: &str, value: &str) -> ObservedTriple {
        ObservedTriple { predicate: predicate.to_string(), value: value.to_string(), value_type: "xsd:string".to_string() }
    }

    #[test]
    fn insert_when_only_in_new() {
        let old = EntityTripleMap::new();
        let mut new = EntityTripleMap::new();
        new.insert("http://x/e1".into(), vec![triple("pf:name", "Acme")]);
        let events = diff(&old, &new, "http://x/audit", "doc-1", Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change_type, ChangeType::Insert);
        assert_eq!(events[0].new_value.as_deref(), Some("Acme"));
        assert_eq!(events[0].previous_value, None);
    }

    #[test]
    fn delete_when_only_in_old() {
        let mut old = EntityTripleMap::new();
        old.insert("http://x/e1".into(), vec![triple("pf:name", "Acme")]);
        let new = EntityTripleMap::new();
        let events = diff(&old, &new, "http://x/audit", "doc-1", Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change_type, ChangeType::Delete);
        assert_eq!(events[0].previous_value.as_deref(), Some("Acme"));
        assert_eq!(events[0].new_value, None);
    }

    #[test]
    fn update_when_value_changes() {
        let mut old = EntityTripleMap::new();
        old.insert("http://x/e1".into(), vec![triple("pf:name", "Acme")]);
        let mut new = EntityTripleMap::new();
        new.insert("http://x/e1".into(), vec![triple("pf:name", "Acme Corp")]);
        let events = diff(&old, &new, "http://x/audit", "doc-1", Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change_type, ChangeType::Update);
        assert_eq!(events[0].previous_value.as_deref(), Some("Acme"));
        assert_eq!(events[0].new_value.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn no_event_when_unchanged() {
        let mut old = EntityTripleMap::new();
        old.insert("http://x/e1".into(), vec![triple("pf:name", "Acme")]);
        let new = old.clone();
        let events = diff(&old, &new, "http://x/audit", "doc-1", Utc::now());
        assert!(events.is_empty());
    }

    #[test]
    fn event_uris_are_unique() {
        let old = EntityTripleMap::new();
        let mut new = EntityTripleMap::new();
        new.insert("http://x/e1".into(), vec![triple("pf:name", "A"), triple("pf:age", "30")]);
        let events = diff(&old, &new, "http://x/audit", "doc-1", Utc::now());
        assert_eq!(events.len(), 2);
        assert_ne!(events[0].event_uri, events[1].event_uri);
    }

    #[test]
    fn change_event_carries_required_predicates() {
        let mut old = EntityTripleMap::new();
        old.insert("http://x/e1".into(), vec![triple("pf:name", "Acme")]);
        let mut new = EntityTripleMap::new();
        new.insert("http://x/e1".into(), vec![triple("pf:name", "Acme Corp")]);
        let events = diff(&old, &new, "http://x/audit", "doc-1", Utc::now());
        let triples = events[0].to_triples();
        let predicates: Vec<&str> = triples.iter().map(|(_, p, _)| p.as_str()).collect();
        for required in ["rdf:type", "pf:entity", "pf:property", "pf:changeType", "pf:changedAt", "pf:sourceDocument", "pf:previousValue", "pf:newValue"] {
            assert!(predicates.contains(&required), "missing {required}");
        }
    }

    #[test]
    fn batching_respects_triple_budget_and_preserves_all_events() {
        let old = EntityTripleMap::new();
        let mut new = EntityTripleMap::new();
        for i in 0..5 {
            new.insert(format!("http://x/e{i}"), vec![triple("pf:name", "A")]);
        }
        let events = diff(&old, &new, "http://x/audit", "doc-1", Utc::now());
        let batches = batch_triples(&events, 2 * 6); // 2 events per batch (6 triples each)
        let total_triples: usize = batches.iter().map(|b| b.len()).sum();
        assert_eq!(total_triples, events.len() * 6);
        assert!(batches.iter().all(|b| b.len() <= 12));
    }
}

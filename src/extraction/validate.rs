//! Validate stage.

use super::types::{ExtractedEntity, ExtractedRelationship};
use crate::event::types::ClaimStatus;
use crate::ontology::schema::{OntologySchema, XsdType};

#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Valid, possibly with a claim-status downgrade applied.
    Valid { item: T, claim_status: ClaimStatus, confidence: f64 },
    /// Not recoverable — becomes a `QuarantineRecord` instead of the
    /// original event.
    Quarantine { reason: String, recoverable: bool },
}

fn matches_xsd(range: XsdType, value: &str) -> bool {
    match range {
        XsdType::Integer => value.parse::<i64>().is_ok(),
        XsdType::Decimal => value.parse::<f64>().is_ok(),
        XsdType::Date => {
            value.len() == 10 && value.as_bytes().get(4) == Some(&b'-') && value.as_bytes().get(7) == Some(&b'-') && value.chars().all(|c| c.is_ascii_digit() || c == '-')
        }
        XsdType::DateTime => value.len() >= 19 && value.as_bytes().get(10) == Some(&b'T'),
        XsdType::Boolean => value == "true" || value == "false",
        XsdType::AnyUri => value.starts_with("http://") || value.starts_with("https://"),
        XsdType::String => true,
    }
}

/// Validates an extracted entity against the ontology version: unknown class quarantines (not recoverable); missing
/// identity keys quarantines; an attribute type mismatch downgrades to
/// CLAIM and clamps confidence to <= 0.5 (recoverable).
pub fn validate_entity(schema: &OntologySchema, entity: &ExtractedEntity) -> Outcome<ExtractedEntity> {
    let class = match schema.class(&entity.class) {
        Some(c) => c,
        None => return Outcome::Quarantine { reason: format!("unknown class: {}", entity.class), recoverable: false },
    };

    let present: std::collections::HashSet<&str> = entity.identity_attrs.iter().map(|(k, _)| k.as_str()).collect();
    if !class.identity_attrs.iter().all(|k| present.contains(k.as_str())) {
        return Outcome::Quarantine { reason: format!("missing identity keys for class {}", entity.class), recoverable: false };
    }

    let data_props = schema.data_properties_for(&entity.class);
    let mut confidence = entity.confidence;
    let mut claim_status = ClaimStatus::Fact;
    for (key, value) in entity.attributes.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s))) {
        if let Some(prop) = data_props.iter().find(|p| p.name == key) {
            if !matches_xsd(prop.range, value) {
                claim_status = ClaimStatus::Claim;
                confidence = confidence.min(0.5);
            }
        }
    }

    let mut item = entity.clone();
    item.confidence = confidence;
    Outcome::Valid { item, claim_status, confidence }
}

/// Validates an extracted relationship: unknown relationship type
/// quarantines, as does a domain/range class mismatch.
pub fn validate_relationship(schema: &OntologySchema, rel: &ExtractedRelationship) -> Outcome<ExtractedRelationship> {
    let object_prop = match schema.relationship(&rel.relationship_type) {
        Some(p) => p,
        None => return Outcome::Quarantine { reason: format!("unknown relationship type: {}", rel.relationship_type), recoverable: false },
    };

    if !object_prop.domain_class.eq_ignore_ascii_case(&rel.subject_class) || !object_prop.range_class.eq_ignore_ascii_case(&rel.object_class) {
        return Outcome::Quarantine {
            reason: format!("domain/range mismatch for {}: expected {}->{}", rel.relationship_type, object_prop.domain_class, object_prop.range_class),
            recoverable: false,
        };
    }

    Outcome::Valid { item: rel.clone(), claim_status: ClaimStatus::Fact, confidence: rel.confidence }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::schema::{ClassDef, DataProperty, ObjectProperty};

    fn schema() -> OntologySchema {
        OntologySchema {
            ontology_version: "v1".into(),
            classes: vec![ClassDef { name: "Person".into(), iri: "http://x/Person".into(), identity_attrs: vec!["ssn".into()] }],
            data_properties: vec![DataProperty { name: "dob".into(), domain_class: "Person".into(), range: XsdType::Date, required: false }],
            object_properties: vec![ObjectProperty { name: "worksAt".into(), domain_class: "Person".into(), range_class: "Org".into() }],
        }
    }

    fn entity() -> ExtractedEntity {
        ExtractedEntity {
            class: "Person".into(),
            name: "Alice".into(),
            identity_attrs: vec![("ssn".into(), "123".into())],
            attributes: serde_json::Map::new(),
            display_name: "Alice".into(),
            confidence: 0.9,
            span: (0, 5),
            quote: "Alice".into(),
        }
    }

    #[test]
    fn unknown_class_quarantines() {
        let mut e = entity();
        e.class = "Ghost".into();
        assert!(matches!(validate_entity(&schema(), &e), Outcome::Quarantine { recoverable: false, .. }));
    }

    #[test]
    fn missing_identity_keys_quarantine() {
        let mut e = entity();
        e.identity_attrs = vec![];
        assert!(matches!(validate_entity(&schema(), &e), Outcome::Quarantine { .. }));
    }

    #[test]
    fn bad_date_downgrades_to_claim_and_clamps_confidence() {
        let mut e = entity();
        e.attributes.insert("dob".into(), serde_json::json!("not-a-date"));
        match validate_entity(&schema(), &e) {
            Outcome::Valid { claim_status, confidence, .. } => {
                assert_eq!(claim_status, ClaimStatus::Claim);
                assert!(confidence <= 0.5);
            }
            Outcome::Quarantine { .. } => panic!("expected valid-but-downgraded"),
        }
    }

    #[test]
    fn domain_range_mismatch_quarantines_edge() {
        let rel = ExtractedRelationship {
            relationship_type: "worksAt".into(),
            subject_name: "Alice".into(),
            subject_class: "Org".into(),
            object_name: "Acme".into(),
            object_class: "Person".into(),
            confidence: 0.9,
            span: (0, 5),
            quote: "x".into(),
        };
        assert!(matches!(validate_relationship(&schema(), &rel), Outcome::Quarantine { .. }));
    }
}

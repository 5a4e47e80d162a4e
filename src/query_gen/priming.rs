//! Priming-text builders for the two query generation targets:
//! enumerated ontology classes/properties plus a bounded sample of actual
//! data for SPARQL, and node labels/relationship direction/property samples
//! for Cypher.

use crate::adapter::traits::LpgSchema;
use crate::ontology::schema::{OntologySchema, XsdType};
use std::fmt::Write as _;

/// Hard cap on rows included in SPARQL sample-data priming.
pub const MAX_SAMPLE_ROWS: usize = 30;

fn xsd_type_name(t: XsdType) -> &'static str {
    match t {
        XsdType::Integer => "xsd:integer",
        XsdType::Decimal => "xsd:decimal",
        XsdType::Date => "xsd:date",
        XsdType::DateTime => "xsd:dateTime",
        XsdType::Boolean => "xsd:boolean",
        XsdType::AnyUri => "xsd:anyURI",
        XsdType::String => "xsd:string",
    }
}

/// Builds the full SPARQL priming text: classes with IRIs, data properties
/// grouped by domain class with typed range, object properties grouped by
/// domain class with range, and up to [`MAX_SAMPLE_ROWS`] sample rows.
pub fn build_sparql_priming(schema: &OntologySchema, sample_rows: &[serde_json::Value]) -> String {
    let mut out = String::new();
    writeln!(out, "Ontology version: {}", schema.ontology_version).ok();

    writeln!(out, "\nClasses:").ok();
    for class in &schema.classes {
        writeln!(out, "- {} <{}>", class.name, class.iri).ok();
    }

    writeln!(out, "\nData properties (by class):").ok();
    for class in &schema.classes {
        let props = schema.data_properties_for(&class.name);
        if props.is_empty() {
            continue;
        }
        writeln!(out, "  {}:", class.name).ok();
        for p in props {
            let required = if p.required { "required" } else { "optional" };
            writeln!(out, "    - {} : {} ({})", p.name, xsd_type_name(p.range), required).ok();
        }
    }

    writeln!(out, "\nObject properties (by domain class):").ok();
    for class in &schema.classes {
        let props = schema.object_properties_for(&class.name);
        if props.is_empty() {
            continue;
        }
        writeln!(out, "  {}:", class.name).ok();
        for p in props {
            writeln!(out, "    - {} -> {}", p.name, p.range_class).ok();
        }
    }

    if !sample_rows.is_empty() {
        writeln!(out, "\nSample data (up to {MAX_SAMPLE_ROWS} rows):").ok();
        for row in sample_rows.iter().take(MAX_SAMPLE_ROWS) {
            writeln!(out, "  - {row}").ok();
        }
    }

    writeln!(out, "\nInstructions:").ok();
    writeln!(out, "- Use full IRIs in <...>.").ok();
    writeln!(out, "- Use OPTIONAL for properties that are not required on every instance.").ok();
    writeln!(out, "- Use REGEX(?x, \"...\", \"i\") for text matching.").ok();
    writeln!(out, "- Prefer multi-hop patterns with UNION or nested triples for AND/OR conditions.").ok();
    out
}

/// Builds the Cypher priming text: node labels, relationship patterns
/// (copied verbatim, direction-exact), and property samples.
pub fn build_cypher_priming(schema: &LpgSchema) -> String {
    let mut out = String::new();
    writeln!(out, "Node labels:").ok();
    for label in &schema.node_labels {
        writeln!(out, "- {label}").ok();
    }

    writeln!(out, "\nRelationship patterns (copy direction exactly):").ok();
    for rel in &schema.relationship_types {
        writeln!(out, "- (:{})-[:{}]->(:{})", rel.from_label, rel.rel_type, rel.to_label).ok();
    }

    if !schema.sample_properties.is_empty() {
        writeln!(out, "\nProperty samples:").ok();
        for (name, sample) in &schema.sample_properties {
            writeln!(out, "- {name}: {sample}").ok();
        }
    }

    writeln!(out, "\nRules:").ok();
    writeln!(out, "- Every matched node MUST carry a WHERE clause on n.workspace_id for tenant isolation.").ok();
    writeln!(out, "- When folder scoping is active, nodes MUST also filter on n.source_document.").ok();
    writeln!(out, "- Non-aggregate queries MUST include a LIMIT clause.").ok();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::traits::RelationshipPattern;
    use crate::ontology::schema::{ClassDef, DataProperty, ObjectProperty};

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
            object_properties: vec![ObjectProperty { name: "ownedBy".into(), domain_class: "Customer".into(), range_class: "Agent".into() }],
        }
    }

    #[test]
    fn sparql_priming_includes_classes_properties_and_samples() {
        let schema = sample_schema();
        let rows = vec![serde_json::json!({"name": "Acme"})];
        let priming = build_sparql_priming(&schema, &rows);
        assert!(priming.contains("Customer <http://x/Customer>"));
        assert!(priming.contains("riskScore : xsd:decimal (optional)"));
        assert!(priming.contains("ownedBy -> Agent"));
        assert!(priming.contains("Acme"));
    }

    #[test]
    fn sparql_priming_caps_sample_rows() {
        let schema = sample_schema();
        let rows: Vec<_> = (0..50).map(|i| serde_json::json!({"i": i})).collect();
        let priming = build_sparql_priming(&schema, &rows);
        assert_eq!(priming.matches("- {\"i\":").count(), MAX_SAMPLE_ROWS);
    }

    #[test]
    fn cypher_priming_copies_relationship_direction_verbatim() {
        let schema = LpgSchema {
            node_labels: vec!["Customer".into(), "Order".into()],
            relationship_types: vec![RelationshipPattern { rel_type: "PLACED".into(), from_label: "Customer".into(), to_label: "Order".into() }],
            sample_properties: vec![],
        };
        let priming = build_cypher_priming(&schema);
        assert!(priming.contains("(:Customer)-[:PLACED]->(:Order)"));
        assert!(priming.contains("workspace_id"));
    }
}

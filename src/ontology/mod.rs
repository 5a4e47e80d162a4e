//! Ontology fabric: named-graph IRI rules and the FROM-clause composer
//!.

pub mod error;
pub mod from_clause;
pub mod iri;
pub mod schema;
pub mod vocab;

pub use error::OntologyError;
pub use from_clause::{compose_from_clauses, FromClauseRequest};
pub use schema::OntologySchema;

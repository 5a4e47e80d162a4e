//! Ontology fabric error type

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OntologyError {
    #[error("IRI component must not be empty or the literal string 'undefined': {0}")]
    InvalidComponent(String),

    #[error("unknown graph scope: {0}")]
    UnknownScope(String),
}

//! SPARQL/Cypher generation and repair: ontology/schema priming,
//! syntactic post-processing repairs, deterministic rule enforcement, and
//! the execute-with-one-retry loop.

pub mod cypher;
pub mod error;
pub mod priming;
pub mod repair;
pub mod sparql;

pub use error::GenerationError;

//! Audit / diff engine: detects entity-property changes between
//! an existing and a new triple snapshot and serializes them as batched
//! `ChangeEvent`s in the audit graph.

pub mod change_event;
pub mod diff;

pub use change_event::{ChangeEvent, ChangeType};
pub use diff::{batch_triples, diff, EntityTripleMap, ObservedTriple, DEFAULT_BATCH_SIZE};

//! Graph event model.

pub mod batch;
pub mod types;

pub use batch::{BatchStats, GraphEventBatch};
pub use types::{ClaimStatus, GraphEvent};

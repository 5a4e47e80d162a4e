//! Store adapters — the narrow contracts the rest of the crate talks to
//! instead of touching a concrete vector index, graph database, triplestore,
//! or SQL catalog directly.
//!
//! Each trait here mirrors the teacher's `Adapter` / `AdapterSink` split: a
//! narrow async contract plus an in-memory reference implementation used by
//! the rest of the crate's tests (real network-backed drivers are out of
//! scope — interface only).

pub mod acl;
pub mod error;
pub mod kv;
pub mod lpg;
pub mod sql;
pub mod traits;
pub mod triplestore;
pub mod vector;

pub use acl::{AllowAllAcl, CrossWorkspaceAcl};
pub use error::AdapterError;
pub use kv::InMemoryKvAdapter;
pub use lpg::InMemoryLpgAdapter;
pub use sql::InMemorySqlFederator;
pub use traits::{KvAdapter, LpgAdapter, SqlFederator, TriplestoreAdapter, VectorAdapter};
pub use triplestore::InMemoryTriplestoreAdapter;
pub use vector::InMemoryVectorAdapter;

//! Concurrency & resource layer.

pub mod background;
pub mod cancel;
pub mod pool;
pub mod retry;

pub use background::spawn_bounded;
pub use cancel::CancellationToken;
pub use pool::BoundedPool;
pub use retry::with_backoff;

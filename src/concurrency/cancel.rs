//! Cooperative cancellation for pipeline runs and orchestrator requests
//!.
//!
//! Adapted directly from the teacher's `adapter::cancel::CancellationToken`:
//! the caller sets the token, the running stage/step checks it at its next
//! suspension point. Already-committed writes remain valid — there is no
//! rollback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

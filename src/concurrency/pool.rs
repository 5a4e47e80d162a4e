//! Bounded concurrency pools over `tokio::sync::Semaphore`, in
//! the style of the teacher's `ExtractionCoordinator.analysis_semaphore` /
//! `semantic_semaphore`: FIFO-fair, configurable capacity, builder-style
//! reconfiguration.

use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

#[derive(Clone)]
pub struct BoundedPool {
    semaphore: Arc<Semaphore>,
}

impl BoundedPool {
    pub fn new(capacity: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(capacity)) }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.semaphore = Arc::new(Semaphore::new(capacity));
        self
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquires a permit, surfacing `ConcurrencyLimitExceeded` if the
    /// semaphore has been closed out from under the caller.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, crate::error::ErrorKind> {
        self.semaphore.acquire().await.map_err(|_| crate::error::ErrorKind::ConcurrencyLimitExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capacity_limits_concurrent_permits() {
        let pool = BoundedPool::new(2);
        let _p1 = pool.acquire().await.unwrap();
        let _p2 = pool.acquire().await.unwrap();
        assert_eq!(pool.available_permits(), 0);
    }

    #[test]
    fn with_capacity_resets_permits() {
        let pool = BoundedPool::new(2).with_capacity(10);
        assert_eq!(pool.available_permits(), 10);
    }
}

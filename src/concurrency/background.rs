//! Bounded fire-and-forget background tasks.
//!
//! Used for access-count bumps after a memory KNN search and post-chat
//! memory extraction — work the caller doesn't want to block on, but that
//! still needs a concurrency ceiling so a burst of requests can't spawn an
//! unbounded number of tasks.

use super::pool::BoundedPool;
use std::future::Future;

/// Spawns `task` on the Tokio runtime once a permit is available from
/// `pool`, without the caller awaiting completion. If the pool is closed
/// the task is dropped rather than spawned.
pub fn spawn_bounded<F>(pool: BoundedPool, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let Ok(_permit) = pool.acquire().await else { return };
        task.await;
    });
}

//! Fixed backoff retry policy: 1s, 2s, 3s delays, max two
//! retries, applied only to retriable errors.

use std::future::Future;
use std::time::Duration;

const BACKOFF: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(3)];
const MAX_RETRIES: usize = 2;

/// Runs `operation` up to `MAX_RETRIES + 1` times, sleeping `BACKOFF[attempt]`
/// between attempts, as long as `is_retriable` returns true for the error.
/// Returns the last error if every attempt fails.
pub async fn with_backoff<T, E, F, Fut>(is_retriable: impl Fn(&E) -> bool, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_RETRIES && is_retriable(&err) => {
                tokio::time::sleep(BACKOFF[attempt]).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_up_to_max_then_gives_up() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), &str> = with_backoff(
            |_: &&str| true,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("always fails") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn non_retriable_errors_stop_immediately() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), &str> = with_backoff(
            |_: &&str| false,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("not retriable") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_ok() {
        let result = with_backoff(|_: &&str| true, || async { Ok::<_, &str>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}

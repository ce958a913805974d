use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Bounded exponential backoff used by every store-write call site.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: u32,
    pub initial: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial: Duration::from_millis(100),
            cap: Duration::from_millis(1600),
        }
    }
}

/// Runs `op` until it succeeds, a non-transient error occurs, or the attempt
/// budget is exhausted. The last error is returned as-is; callers decide how
/// fatal exhaustion is for their message.
pub async fn with_backoff<T, E, F, Fut, P>(policy: Backoff, is_transient: P, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delay = policy.initial;
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.attempts && is_transient(&err) => {
                warn!(
                    "transient failure on attempt {}/{}: {}; retrying in {:?}",
                    attempt, policy.attempts, err, delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, policy.cap);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_backoff(Backoff::default(), |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("locked") } else { Ok(42) } }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_backoff(Backoff::default(), |_| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("locked") }
        })
        .await;

        assert_eq!(result, Err("locked"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_backoff(Backoff::default(), |_| false, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("constraint violation") }
        })
        .await;

        assert_eq!(result, Err("constraint violation"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

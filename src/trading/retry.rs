// src/trading/retry.rs
//
// Fixed-interval bounded retry for fallible async actions.

use std::fmt::Display;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// Retry settings for one kind of action.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval: Duration::from_millis(interval_ms),
        }
    }
}

/// Run `action` until it succeeds or `max_attempts` attempts have failed.
///
/// Attempts run one after another with the same `interval` between them, no
/// backoff growth and no jitter. The error of the final attempt is returned.
/// A `max_attempts` of zero still runs the action once.
pub async fn execute<F, Fut, T, E>(mut action: F, max_attempts: u32, interval: Duration) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!("Attempt {}/{} failed: {}. Retrying in {:?}", attempt, max_attempts, e, interval);
                sleep(interval).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Same as [`execute`], taking the settings from a [`RetryPolicy`].
pub async fn execute_with<F, Fut, T, E>(action: F, policy: RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    execute(action, policy.max_attempts, policy.interval).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<u32, String> = execute(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= 3 {
                    Err(format!("failure {}", n))
                } else {
                    Ok(n)
                }
            },
            5,
            Duration::from_millis(50),
        )
        .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // three failures, three fixed waits
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(150) && waited < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), String> = execute(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {}", n))
            },
            3,
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // no wait after the final attempt
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(200) && waited < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_wait() {
        let started = Instant::now();
        let result: Result<&str, String> =
            execute_with(|| async { Ok("sig") }, RetryPolicy::new(10, 1_000)).await;

        assert_eq!(result.unwrap(), "sig");
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), String> = execute(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope".to_string())
            },
            0,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

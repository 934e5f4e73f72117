//! Retry with exponential backoff
//!
//! Stateless retry wrappers for operations that fail transiently. The policy
//! controls how many retries are attempted after the initial call and how the
//! delay between attempts grows.
//!
//! # Example
//! ```no_run
//! use ward_core_resilience::retry::{retry, RetryPolicy};
//!
//! async fn example() -> Result<String, std::io::Error> {
//!     retry(&RetryPolicy::standard(), || async {
//!         // Your operation here
//!         Ok("success".to_string())
//!     })
//!     .await
//! }
//! ```

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Configuration for retry behavior.
///
/// `max_retries` counts attempts *after* the first call, so a policy with
/// `max_retries = 3` invokes the operation at most four times.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Cap applied to the computed delay
    pub max_delay: Duration,

    /// Multiplier applied per failed attempt (typically 2.0)
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Short delays for operations that fail fast.
    pub fn fast() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }

    /// Balanced policy for most use cases.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Longer delays for external API calls.
    pub fn slow() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Backoff delay before retrying after the `attempt`-th failure (0-based):
    /// `min(base_delay * backoff_factor^attempt, max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt as i32);
        let secs = (self.base_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Execute an operation, retrying every failure up to the policy's limit.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    retry_with(policy, f, |_, _| true, |_, _| {}).await
}

/// Execute an operation, retrying only failures the predicate accepts.
pub async fn retry_if<F, Fut, T, E, P>(policy: &RetryPolicy, f: F, should_retry: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
    P: FnMut(&E, u32) -> bool,
{
    retry_with(policy, f, should_retry, |_, _| {}).await
}

/// Full-form retry: a retryability predicate plus a hook fired before each
/// retry sleep.
///
/// `should_retry` is consulted once per failure — including the final one —
/// with the error and the 0-based attempt index. It gates only the *next*
/// attempt; it never prevents the attempt that already ran. Exhausting
/// retries returns the last error unchanged.
pub async fn retry_with<F, Fut, T, E, P, H>(
    policy: &RetryPolicy,
    mut f: F,
    mut should_retry: P,
    mut on_retry: H,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
    P: FnMut(&E, u32) -> bool,
    H: FnMut(&E, u32),
{
    let mut attempt: u32 = 0;

    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                let retryable = should_retry(&e, attempt);

                if !retryable {
                    debug!(error = ?e, "error is not retryable, returning immediately");
                    return Err(e);
                }
                if attempt >= policy.max_retries {
                    error!(attempts = attempt + 1, error = ?e, "all retry attempts exhausted");
                    return Err(e);
                }

                on_retry(&e, attempt);
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "attempt failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_policy_presets() {
        let fast = RetryPolicy::fast();
        assert_eq!(fast.base_delay, Duration::from_millis(50));

        let slow = RetryPolicy::slow();
        assert_eq!(slow.max_retries, 5);

        let none = RetryPolicy::no_retry();
        assert_eq!(none.max_retries, 0);
    }

    #[test]
    fn test_delay_growth_and_cap() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(8), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&RetryPolicy::default(), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let retries = Arc::new(AtomicU32::new(0));
        let retries_clone = retries.clone();

        let policy = RetryPolicy {
            max_retries: 3,
            ..Default::default()
        };

        let result = retry_with(
            &policy,
            || {
                let counter = counter_clone.clone();
                async move {
                    let count = counter.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err("not yet")
                    } else {
                        Ok(42)
                    }
                }
            },
            |_, _| true,
            |_, _| {
                retries_clone.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(retries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_unchanged() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            ..Default::default()
        };

        let result = retry(&policy, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>("always fails")
            }
        })
        .await;

        assert_eq!(result, Err("always fails"));
        // Initial attempt plus two retries
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_if(
            &RetryPolicy::fast(),
            || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>("permanent failure")
                }
            },
            |_, _| false,
        )
        .await;

        assert_eq!(result, Err("permanent failure"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy_single_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&RetryPolicy::no_retry(), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>("nope")
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

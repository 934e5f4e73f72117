//! Combined circuit breaker + retry guard
//!
//! Composes a [`CircuitBreaker`] with a [`RetryPolicy`]: the breaker wraps the
//! operation, and the retry loop wraps the circuit-protected call. Open-circuit
//! rejections are never retried — a rejection is a deterministic, instantaneous
//! signal that retrying before the reset timeout is wasted work. Genuine
//! operation failures and timeouts remain retryable.
//!
//! # Example
//! ```no_run
//! use ward_core_resilience::{CircuitBreaker, CircuitBreakerConfig, CombinedGuard, RetryPolicy};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("upstream unavailable")]
//! struct UpstreamError;
//!
//! #[tokio::main]
//! async fn main() {
//!     let breaker = CircuitBreaker::new("billing", CircuitBreakerConfig::default());
//!     let guard = CombinedGuard::new(breaker, RetryPolicy::standard());
//!
//!     let result = guard
//!         .execute(|| async { Ok::<_, UpstreamError>("invoice") })
//!         .await;
//!
//!     assert!(result.is_ok());
//! }
//! ```

use crate::circuit_breaker::CircuitBreaker;
use crate::error::CircuitError;
use crate::retry::{retry_if, RetryPolicy};

/// A circuit breaker and retry policy fused into one call wrapper.
#[derive(Debug, Clone)]
pub struct CombinedGuard {
    breaker: CircuitBreaker,
    policy: RetryPolicy,
}

impl CombinedGuard {
    /// Compose a breaker with a retry policy.
    pub fn new(breaker: CircuitBreaker, policy: RetryPolicy) -> Self {
        Self { breaker, policy }
    }

    /// The underlying circuit breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The retry policy applied around the circuit-protected call.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation through the breaker, retrying failures per the
    /// policy. `CircuitError::Open` is excluded from retrying; everything
    /// else (operation errors, timeouts) is retried until the policy is
    /// exhausted.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        retry_if(
            &self.policy,
            || self.breaker.execute(|| f()),
            |err, _attempt| !err.is_open(),
        )
        .await
    }
}

//! Resilience Integration Test: Flaky Dependency
//!
//! This test drives the full stack (registry → guard → breaker → retry)
//! against a simulated dependency that degrades and recovers.
//!
//! Test Scenario:
//! 1. Setup: Registry-provisioned breaker with low thresholds, wrapped in a
//!    CombinedGuard with a fast retry policy
//! 2. Degradation: The dependency starts failing every call; the guard
//!    retries until the breaker opens, then stops retrying
//! 3. Fast-fail: While open, calls are rejected without touching the
//!    dependency
//! 4. Recovery: After the reset timeout the breaker probes, the dependency
//!    is healthy again, and the circuit closes
//! 5. Verification: Stats reflect every phase

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ward_core_resilience::prelude::*;

#[derive(Debug, thiserror::Error)]
#[error("dependency unavailable")]
struct DependencyError;

/// A dependency that fails while `broken` is set and counts invocations.
struct FlakyDependency {
    broken: AtomicBool,
    calls: AtomicU32,
}

impl FlakyDependency {
    fn new() -> Self {
        Self {
            broken: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        }
    }

    async fn call(&self) -> Result<&'static str, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            Err(DependencyError)
        } else {
            Ok("payload")
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_guard_degrades_fast_fails_and_recovers() {
    // ============================================================
    // SETUP
    // ============================================================

    let registry = CircuitBreakerRegistry::new();
    let breaker = registry.get_or_create(
        "flaky-dep",
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 1,
            reset_timeout: Duration::from_secs(5),
            ..CircuitBreakerConfig::default()
        },
    );
    let guard = CombinedGuard::new(
        breaker.clone(),
        RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_factor: 2.0,
        },
    );
    let dep = Arc::new(FlakyDependency::new());

    // Healthy baseline
    let out = guard.execute(|| dep.call()).await.unwrap();
    assert_eq!(out, "payload");
    assert_eq!(breaker.state().await, CircuitState::Closed);

    // ============================================================
    // PHASE 1: Dependency degrades, breaker opens mid-retry
    // ============================================================

    dep.broken.store(true, Ordering::SeqCst);
    dep.calls.store(0, Ordering::SeqCst);

    let err = guard.execute(|| dep.call()).await.unwrap_err();
    assert!(err.is_open());
    assert_eq!(breaker.state().await, CircuitState::Open);
    // Threshold 3: the retry loop stops at the attempt that opened the
    // circuit instead of burning the full retry budget
    assert_eq!(dep.calls.load(Ordering::SeqCst), 3);

    // ============================================================
    // PHASE 2: Fast-fail while open
    // ============================================================

    dep.calls.store(0, Ordering::SeqCst);
    let err = guard.execute(|| dep.call()).await.unwrap_err();
    assert!(err.is_open());
    assert_eq!(dep.calls.load(Ordering::SeqCst), 0);

    // ============================================================
    // PHASE 3: Reset timeout elapses, probe succeeds, circuit closes
    // ============================================================

    dep.broken.store(false, Ordering::SeqCst);
    tokio::time::advance(Duration::from_secs(6)).await;

    let out = guard.execute(|| dep.call()).await.unwrap();
    assert_eq!(out, "payload");
    assert_eq!(breaker.state().await, CircuitState::Closed);

    // ============================================================
    // VERIFICATION: Stats
    // ============================================================

    let stats = breaker.stats().await;
    assert_eq!(stats.times_opened, 1);
    assert!(stats.rejected >= 1);
    assert!(stats.succeeded >= 2);
    assert!(stats.failed >= 3);
}

#[tokio::test]
async fn test_registry_shares_breaker_state_across_guards() {
    let registry = CircuitBreakerRegistry::new();
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        ..CircuitBreakerConfig::default()
    };

    let guard_a = CombinedGuard::new(
        registry.get_or_create("shared", config.clone()),
        RetryPolicy::no_retry(),
    );
    let guard_b = CombinedGuard::new(
        registry.get_or_create("shared", config),
        RetryPolicy::no_retry(),
    );

    let err = guard_a
        .execute(|| async { Err::<(), _>(DependencyError) })
        .await
        .unwrap_err();
    assert!(!err.is_open());

    // The failure through guard_a opened the breaker guard_b shares
    let err = guard_b
        .execute(|| async { Ok::<_, DependencyError>(()) })
        .await
        .unwrap_err();
    assert!(err.is_open());
}

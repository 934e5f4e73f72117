//! Ward Core Resilience: Pure-logic fault tolerance primitives
//!
//! # Overview
//!
//! This crate provides the in-process building blocks Ward services use to
//! protect calls to unreliable dependencies:
//!
//! - **Circuit Breaker**: Fails fast when a dependency is unhealthy, with a
//!   time-windowed failure log and lazy half-open recovery
//! - **Registry**: Process-wide named-instance cache of breakers, injected
//!   explicitly rather than hidden in a global
//! - **Retry**: Exponential backoff with retryability predicates and hooks
//! - **Combined Guard**: Breaker + retry fused with one rule — open-circuit
//!   rejections are never retried
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - Storage systems (databases, key-value stores)
//! - Network protocols (HTTP, gRPC)
//! - Application-specific concerns
//!
//! Cross-process primitives (distributed rate limiting, locks) live in the
//! companion `ward-core-coordination` crate.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Your Service                    │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Retry (Combined Guard)            │  ← Backoff on transient errors
//! │  (skips retrying open-circuit rejects)  │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Circuit Breaker                   │  ← Fail-fast protection
//! │  (windowed failures, lazy half-open)    │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//!         External Dependency
//!        (SaaS API, internal service)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use ward_core_resilience::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("api unavailable")]
//! struct ApiError;
//!
//! # async fn example() {
//! let registry = CircuitBreakerRegistry::new();
//! let breaker = registry.get_or_create(
//!     "payments-api",
//!     CircuitBreakerConfig {
//!         failure_threshold: 5,
//!         reset_timeout: Duration::from_secs(30),
//!         ..Default::default()
//!     },
//! );
//!
//! let guard = CombinedGuard::new(breaker, RetryPolicy::standard());
//! let result = guard
//!     .execute(|| async { Ok::<_, ApiError>("charged") })
//!     .await;
//! # let _ = result;
//! # }
//! ```

pub mod circuit_breaker;
pub mod error;
pub mod guard;
pub mod registry;
pub mod retry;

// Re-export main types for convenience
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitObservers, CircuitState, CircuitStats,
    FailureClassifier,
};
pub use error::CircuitError;
pub use guard::CombinedGuard;
pub use registry::CircuitBreakerRegistry;
pub use retry::{retry, retry_if, retry_with, RetryPolicy};

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use ward_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::circuit_breaker::{
        CircuitBreaker, CircuitBreakerConfig, CircuitObservers, CircuitState, CircuitStats,
    };
    pub use super::error::CircuitError;
    pub use super::guard::CombinedGuard;
    pub use super::registry::CircuitBreakerRegistry;
    pub use super::retry::{retry, retry_if, retry_with, RetryPolicy};
}

//! # Ward Core Coordination: Cross-Process Resilience Primitives
//!
//! Rate limiting and mutual exclusion that hold across a fleet of processes,
//! built on a shared coordination store.
//!
//! ## Overview
//!
//! The primitives in [`ward-core-resilience`](https://github.com/wardhq/ward)
//! protect a single process. This crate covers the cases where the limit or
//! the lock must be agreed on by every replica of a service: a sliding-window
//! rate limiter that counts requests fleet-wide, and a token-based lock that
//! grants a resource to exactly one holder at a time.
//!
//! ## Key Principles
//!
//! - **Store-agnostic**: everything is written against the
//!   [`CoordinationStore`] trait. [`RedisStore`] backs shared deployments;
//!   [`MemoryStore`] backs tests and single-process use with identical
//!   semantics.
//! - **Rejection is data, not error**: a denied request or a contended lock
//!   comes back as an ordinary value ([`RateLimitDecision`],
//!   `Ok(None)` / [`LockOutcome::NotAcquired`]). Errors mean the store
//!   itself failed.
//! - **Wall-clock anchored**: windows and TTLs are measured in Unix epoch
//!   milliseconds so every process agrees on them.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐
//! │  RateLimiter  │   │  LockService  │
//! │ sliding window│   │  token CAS    │
//! └───────┬───────┘   └───────┬───────┘
//!         │                   │
//!         └───────┬───────────┘
//!                 ▼
//!       ┌───────────────────┐
//!       │ CoordinationStore │  (trait)
//!       └───────┬───────────┘
//!         ┌─────┴─────┐
//!         ▼           ▼
//!   ┌──────────┐ ┌─────────────┐
//!   │RedisStore│ │ MemoryStore │
//!   └──────────┘ └─────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ward_core_coordination::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn CoordinationStore> = Arc::new(MemoryStore::new());
//!
//! let limiter = RateLimiter::new(store.clone(), "api");
//! let quota = RateLimitQuota { max: 100, window: Duration::from_secs(60) };
//! let decision = limiter.consume("user-42", "search", quota).await?;
//!
//! let locks = LockService::new(store, "api");
//! if let Some(handle) = locks.acquire("reindex", LockConfig::default()).await? {
//!     // Exclusive work
//!     locks.release(&handle).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod lock;
pub mod memory;
pub mod rate_limiter;
pub mod redis;
pub mod store;

pub use error::{CoordinationError, Result};
pub use lock::{LockConfig, LockHandle, LockOutcome, LockService};
pub use memory::MemoryStore;
pub use rate_limiter::{RateLimitDecision, RateLimitQuota, RateLimiter};
pub use store::CoordinationStore;

pub use self::redis::RedisStore;

/// Common imports for working with the coordination primitives
pub mod prelude {
    pub use crate::error::{CoordinationError, Result};
    pub use crate::lock::{LockConfig, LockHandle, LockOutcome, LockService};
    pub use crate::memory::MemoryStore;
    pub use crate::rate_limiter::{RateLimitDecision, RateLimitQuota, RateLimiter};
    pub use crate::redis::RedisStore;
    pub use crate::store::CoordinationStore;
}

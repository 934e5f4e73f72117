//! Distributed sliding-window rate limiter
//!
//! A log-based sliding window: every admitted request leaves one
//! timestamped entry in a sorted set, and admission counts the entries in
//! the trailing window. This gives exact per-request admission (no bucket
//! boundary bursts) at the cost of one set member per request in the window.
//!
//! One sorted set exists per `(identifier, action)` pair; entries are pruned
//! lazily whenever the key is touched, and the whole key carries a TTL equal
//! to the window so idle keys vanish on their own.
//!
//! # Approximation under concurrency
//!
//! `consume` runs prune → add → count → (maybe) roll back as separate store
//! commands, not one atomic script. Concurrent consumers on the same key can
//! interleave between the count and the rollback, letting a bounded handful
//! of extra requests through. This is an accepted approximation: the limit
//! is a throttle, not a hard cap. Callers that need exactness must move the
//! sequence into a single store-side script.
//!
//! # Example
//!
//! ```rust,no_run
//! use ward_core_coordination::{MemoryStore, RateLimiter, RateLimitQuota};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let limiter = RateLimiter::new(store, "ward");
//!
//! let quota = RateLimitQuota { max: 100, window: Duration::from_secs(60) };
//! let decision = limiter.consume("user-42", "api-call", quota).await?;
//! if !decision.allowed {
//!     // Surface decision.retry_after to the caller
//! }
//! # Ok(())
//! # }
//! ```

use crate::clock::epoch_millis;
use crate::error::Result;
use crate::store::CoordinationStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Limit for one action: at most `max` requests per trailing `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitQuota {
    /// Maximum requests admitted within the window
    pub max: u64,
    /// Length of the trailing window
    pub window: Duration,
}

/// Outcome of a rate-limit check or consumption.
///
/// Rejection is an ordinary value, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Requests left in the window after this decision
    pub remaining: u64,
    /// Time until the oldest windowed entry ages out
    pub reset_in: Duration,
    /// When rejected, how long to wait before retrying (clamped to ≥ 1s)
    pub retry_after: Option<Duration>,
}

/// Sliding-window-log rate limiter over a shared coordination store.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn CoordinationStore>,
    prefix: String,
}

impl RateLimiter {
    /// Create a rate limiter over a store, namespacing all keys under
    /// `prefix` so services sharing one store cannot collide.
    pub fn new(store: Arc<dyn CoordinationStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, identifier: &str, action: &str) -> String {
        format!("{}:ratelimit:{}:{}", self.prefix, identifier, action)
    }

    /// Drop entries that fell out of the trailing window. Entries scored
    /// exactly at the window edge are still within it.
    async fn prune(&self, key: &str, now_ms: u64, window: Duration) -> Result<()> {
        let cutoff = now_ms.saturating_sub(window.as_millis() as u64);
        if cutoff > 0 {
            self.store
                .zremrangebyscore(key, 0.0, (cutoff - 1) as f64)
                .await?;
        }
        Ok(())
    }

    /// Time until the oldest surviving entry leaves the window.
    async fn reset_in(&self, key: &str, now_ms: u64, window: Duration) -> Result<Duration> {
        let oldest = self.store.zrange_withscores(key, 0, 0).await?;
        Ok(match oldest.first() {
            Some((_, score)) => {
                let expires_at = *score as u64 + window.as_millis() as u64;
                Duration::from_millis(expires_at.saturating_sub(now_ms))
            }
            None => Duration::ZERO,
        })
    }

    /// Read-only admission check: would a request be allowed right now?
    /// Records nothing.
    pub async fn check(
        &self,
        identifier: &str,
        action: &str,
        quota: RateLimitQuota,
    ) -> Result<RateLimitDecision> {
        let key = self.key(identifier, action);
        let now_ms = epoch_millis();

        self.prune(&key, now_ms, quota.window).await?;
        let count = self.store.zcard(&key).await?;
        let reset_in = self.reset_in(&key, now_ms, quota.window).await?;

        Ok(RateLimitDecision {
            allowed: count < quota.max,
            remaining: quota.max.saturating_sub(count),
            reset_in,
            retry_after: None,
        })
    }

    /// Admit and record one request, or reject it.
    ///
    /// On admission the key's TTL is refreshed to the window length; on
    /// rejection the just-added entry is rolled back and `retry_after`
    /// reports when the oldest surviving entry ages out.
    pub async fn consume(
        &self,
        identifier: &str,
        action: &str,
        quota: RateLimitQuota,
    ) -> Result<RateLimitDecision> {
        let key = self.key(identifier, action);
        let now_ms = epoch_millis();

        self.prune(&key, now_ms, quota.window).await?;

        let member = format!("{}-{}", now_ms, Uuid::now_v7());
        self.store.zadd(&key, &member, now_ms as f64).await?;
        let count = self.store.zcard(&key).await?;

        if count <= quota.max {
            self.store.pexpire(&key, quota.window).await?;
            let reset_in = self.reset_in(&key, now_ms, quota.window).await?;
            return Ok(RateLimitDecision {
                allowed: true,
                remaining: quota.max - count,
                reset_in,
                retry_after: None,
            });
        }

        // Over the limit: undo our own entry and report when to come back
        self.store.zrem(&key, &member).await?;
        let reset_in = self
            .reset_in(&key, now_ms, quota.window)
            .await?
            .max(Duration::from_secs(1));

        debug!(
            identifier = %identifier,
            action = %action,
            max = quota.max,
            "rate limit exceeded"
        );

        Ok(RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_in,
            retry_after: Some(reset_in),
        })
    }

    /// Forget all recorded requests for one `(identifier, action)` pair.
    pub async fn reset(&self, identifier: &str, action: &str) -> Result<()> {
        self.store.delete(&self.key(identifier, action)).await?;
        Ok(())
    }

    /// Number of requests currently recorded within the window.
    pub async fn count(&self, identifier: &str, action: &str, window: Duration) -> Result<u64> {
        let key = self.key(identifier, action);
        self.prune(&key, epoch_millis(), window).await?;
        self.store.zcard(&key).await
    }
}

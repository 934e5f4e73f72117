//! Distributed lock service
//!
//! Mutual exclusion across processes via a single store key per resource.
//! Acquisition writes a random token with set-if-absent plus a TTL; release
//! and extension go through the store's compare-and-swap so only the holder
//! whose token still matches can act. The TTL bounds how long a crashed
//! holder can wedge the resource.
//!
//! # TTL tradeoff
//!
//! If a holder outlives its TTL, the key expires and another process can
//! acquire the lock; the original holder's later `release`/`extend` simply
//! return `false` instead of clobbering the new holder. Pick a TTL longer
//! than the critical section, or `extend` periodically from long-running
//! work.
//!
//! # Example
//!
//! ```rust,no_run
//! use ward_core_coordination::{LockConfig, LockOutcome, LockService, MemoryStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let locks = LockService::new(Arc::new(MemoryStore::new()), "ward");
//!
//! let outcome = locks
//!     .with_lock("billing:run", LockConfig::default(), || async {
//!         // Critical section
//!         42
//!     })
//!     .await?;
//!
//! match outcome {
//!     LockOutcome::Completed(n) => assert_eq!(n, 42),
//!     LockOutcome::NotAcquired => { /* someone else holds it */ }
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::store::CoordinationStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Tuning for a single acquisition attempt.
#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    /// How long the lock holds without an `extend`
    pub ttl: Duration,
    /// Extra acquisition attempts after the first fails (contention only)
    pub retry_attempts: u32,
    /// Pause between acquisition attempts
    pub retry_delay: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Proof of a successful acquisition.
///
/// The token is the holder's identity; release and extend only succeed while
/// the stored value still equals it.
#[derive(Debug, Clone)]
pub struct LockHandle {
    resource: String,
    token: String,
}

impl LockHandle {
    /// Resource this handle locks.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Fencing token written into the store.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Result of running a closure under [`LockService::with_lock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome<T> {
    /// The lock was held for the duration of the closure
    Completed(T),
    /// Another holder kept the lock through every acquisition attempt
    NotAcquired,
}

/// Token-based distributed locks over a shared coordination store.
#[derive(Debug, Clone)]
pub struct LockService {
    store: Arc<dyn CoordinationStore>,
    prefix: String,
}

impl LockService {
    /// Create a lock service over a store, namespacing all lock keys under
    /// `prefix`.
    pub fn new(store: Arc<dyn CoordinationStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, resource: &str) -> String {
        format!("{}:lock:{}", self.prefix, resource)
    }

    /// Try to take the lock on `resource`.
    ///
    /// Returns `Ok(None)` when another holder kept it through every attempt;
    /// contention is not an error.
    pub async fn acquire(&self, resource: &str, config: LockConfig) -> Result<Option<LockHandle>> {
        let key = self.key(resource);
        let token = Uuid::new_v4().to_string();

        for attempt in 0..=config.retry_attempts {
            if self
                .store
                .set(&key, &token, Some(config.ttl), true)
                .await?
            {
                debug!(resource = %resource, attempt, "lock acquired");
                return Ok(Some(LockHandle {
                    resource: resource.to_string(),
                    token,
                }));
            }
            if attempt < config.retry_attempts {
                tokio::time::sleep(config.retry_delay).await;
            }
        }

        debug!(resource = %resource, "lock contended, giving up");
        Ok(None)
    }

    /// Release a held lock. Returns `false` when the lock already expired or
    /// was taken over by another holder.
    pub async fn release(&self, handle: &LockHandle) -> Result<bool> {
        self.store
            .compare_and_delete(&self.key(&handle.resource), &handle.token)
            .await
    }

    /// Push the lock's expiry out to `ttl` from now. Returns `false` when
    /// the handle no longer owns the lock.
    pub async fn extend(&self, handle: &LockHandle, ttl: Duration) -> Result<bool> {
        self.store
            .compare_and_expire(&self.key(&handle.resource), &handle.token, ttl)
            .await
    }

    /// Whether any holder currently has the resource locked.
    pub async fn is_locked(&self, resource: &str) -> Result<bool> {
        Ok(self.store.get(&self.key(resource)).await?.is_some())
    }

    /// Remaining lifetime of the current lock, if one exists.
    pub async fn ttl(&self, resource: &str) -> Result<Option<Duration>> {
        self.store.pttl(&self.key(resource)).await
    }

    /// Delete the lock regardless of who holds it. An operator escape hatch
    /// for wedged resources; the evicted holder's CAS operations will start
    /// returning `false`.
    pub async fn force_release(&self, resource: &str) -> Result<bool> {
        warn!(resource = %resource, "force-releasing lock");
        self.store.delete(&self.key(resource)).await
    }

    /// Run `f` while holding the lock on `resource`, releasing on every exit
    /// path. A failed release is logged, not propagated: the TTL will clean
    /// the key up regardless, and the closure's output matters more.
    pub async fn with_lock<F, Fut, T>(
        &self,
        resource: &str,
        config: LockConfig,
        f: F,
    ) -> Result<LockOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let Some(handle) = self.acquire(resource, config).await? else {
            return Ok(LockOutcome::NotAcquired);
        };

        let output = f().await;

        match self.release(&handle).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(resource = %resource, "lock expired before release");
            }
            Err(e) => {
                warn!(resource = %resource, error = %e, "lock release failed");
            }
        }

        Ok(LockOutcome::Completed(output))
    }
}

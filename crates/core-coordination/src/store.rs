//! Coordination store contract
//!
//! Cross-process primitives in this crate are written against this trait, not
//! against a concrete server. The contract is a small slice of a key-value
//! store with sorted sets and two atomic compare-and-swap operations. The
//! CAS methods are part of the contract because lock release/extend must be
//! a single atomic "read current value, compare, act" — a client-side
//! read-then-write opens a race where one holder deletes a lock that a later
//! holder legitimately acquired after expiry.
//!
//! Implementations: [`RedisStore`](crate::redis::RedisStore) for shared
//! deployments, [`MemoryStore`](crate::memory::MemoryStore) for tests and
//! single-process use.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Minimal key-value + sorted-set contract consumed by the rate limiter and
/// lock service.
///
/// Scores are `f64` (wall-clock epoch milliseconds in practice). Plain-key
/// and sorted-set namespaces may alias on the same key — callers keep them
/// apart with key prefixes.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Fetch the value at `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set `key` to `value`, optionally with a TTL and/or only-if-absent
    /// semantics. Returns whether the write happened (`false` only when
    /// `if_not_exists` was requested and the key already existed).
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        if_not_exists: bool,
    ) -> Result<bool>;

    /// Delete `key`. Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Add (or update) `member` with `score` in the sorted set at `key`.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// Remove a single member from the sorted set. Returns whether it existed.
    async fn zrem(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove members with scores in the inclusive range `[min, max]`.
    /// Returns the number removed.
    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<u64>;

    /// Number of members in the sorted set.
    async fn zcard(&self, key: &str) -> Result<u64>;

    /// Members with scores, ordered ascending by score, selected by rank
    /// range (`-1` addresses the last element, as in the store's native
    /// range command).
    async fn zrange_withscores(&self, key: &str, start: i64, stop: i64)
        -> Result<Vec<(String, f64)>>;

    /// Set or refresh the TTL on `key`. Returns `false` when the key does
    /// not exist.
    async fn pexpire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remaining TTL on `key`. `None` when the key does not exist or has no
    /// expiry.
    async fn pttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Atomically delete `key` only if its current value equals `expected`.
    /// Returns whether the delete happened.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool>;

    /// Atomically set the TTL on `key` only if its current value equals
    /// `expected`. Returns whether the expiry was applied.
    async fn compare_and_expire(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool>;
}

impl std::fmt::Debug for dyn CoordinationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CoordinationStore")
    }
}

//! In-memory coordination store
//!
//! Implements the full [`CoordinationStore`] contract against process-local
//! state. Suitable for tests and single-process deployments; for distributed
//! systems use [`RedisStore`](crate::redis::RedisStore).
//!
//! TTLs are enforced lazily: an expired key is dropped the next time anything
//! touches it. All operations run under a single async mutex, which makes the
//! compare-and-swap methods trivially atomic.

use crate::error::Result;
use crate::store::CoordinationStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct StringEntry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct SortedSet {
    /// Kept ordered by (score, member)
    members: Vec<(String, f64)>,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    strings: HashMap<String, StringEntry>,
    zsets: HashMap<String, SortedSet>,
}

impl MemoryInner {
    /// Drop `key` from the string namespace if its TTL has passed.
    fn expire_string(&mut self, key: &str, now: Instant) {
        if let Some(entry) = self.strings.get(key) {
            if entry.expires_at.is_some_and(|at| now >= at) {
                self.strings.remove(key);
            }
        }
    }

    /// Drop `key` from the sorted-set namespace if its TTL has passed.
    fn expire_zset(&mut self, key: &str, now: Instant) {
        if let Some(set) = self.zsets.get(key) {
            if set.expires_at.is_some_and(|at| now >= at) {
                self.zsets.remove(key);
            }
        }
    }
}

/// Process-local [`CoordinationStore`] backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Translate a possibly-negative rank range into vector indices.
/// Returns `None` for an empty selection.
fn rank_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let norm = |idx: i64| if idx < 0 { len + idx } else { idx };
    let start = norm(start).max(0);
    let stop = norm(stop).min(len - 1);
    if start > stop || len == 0 {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        inner.expire_string(key, Instant::now());
        Ok(inner.strings.get(key).map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        if_not_exists: bool,
    ) -> Result<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.expire_string(key, now);

        if if_not_exists && inner.strings.contains_key(key) {
            return Ok(false);
        }

        inner.strings.insert(
            key.to_string(),
            StringEntry {
                value: value.to_string(),
                expires_at: ttl.map(|t| now + t),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.expire_string(key, now);
        inner.expire_zset(key, now);
        let removed_string = inner.strings.remove(key).is_some();
        let removed_zset = inner.zsets.remove(key).is_some();
        Ok(removed_string || removed_zset)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.expire_zset(key, Instant::now());
        let set = inner.zsets.entry(key.to_string()).or_default();
        set.members.retain(|(m, _)| m != member);
        set.members.push((member.to_string(), score));
        set.members
            .sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.expire_zset(key, Instant::now());
        match inner.zsets.get_mut(key) {
            Some(set) => {
                let before = set.members.len();
                set.members.retain(|(m, _)| m != member);
                Ok(set.members.len() < before)
            }
            None => Ok(false),
        }
    }

    async fn zremrangebyscore(&self, key: &str, min: f64, max: f64) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.expire_zset(key, Instant::now());
        match inner.zsets.get_mut(key) {
            Some(set) => {
                let before = set.members.len();
                set.members.retain(|(_, s)| *s < min || *s > max);
                Ok((before - set.members.len()) as u64)
            }
            None => Ok(0),
        }
    }

    async fn zcard(&self, key: &str) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.expire_zset(key, Instant::now());
        Ok(inner.zsets.get(key).map_or(0, |s| s.members.len() as u64))
    }

    async fn zrange_withscores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<(String, f64)>> {
        let mut inner = self.inner.lock().await;
        inner.expire_zset(key, Instant::now());
        let Some(set) = inner.zsets.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match rank_range(set.members.len(), start, stop) {
            Some((lo, hi)) => set.members[lo..=hi].to_vec(),
            None => Vec::new(),
        })
    }

    async fn pexpire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.expire_string(key, now);
        inner.expire_zset(key, now);

        if let Some(entry) = inner.strings.get_mut(key) {
            entry.expires_at = Some(now + ttl);
            return Ok(true);
        }
        if let Some(set) = inner.zsets.get_mut(key) {
            set.expires_at = Some(now + ttl);
            return Ok(true);
        }
        Ok(false)
    }

    async fn pttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.expire_string(key, now);
        inner.expire_zset(key, now);

        let expires_at = inner
            .strings
            .get(key)
            .and_then(|e| e.expires_at)
            .or_else(|| inner.zsets.get(key).and_then(|s| s.expires_at));
        Ok(expires_at.map(|at| at.saturating_duration_since(now)))
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        inner.expire_string(key, Instant::now());
        if inner.strings.get(key).is_some_and(|e| e.value == expected) {
            inner.strings.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn compare_and_expire(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.expire_string(key, now);
        match inner.strings.get_mut(key) {
            Some(entry) if entry.value == expected => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.set("k", "v", None, false).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.delete("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_if_not_exists() {
        let store = MemoryStore::new();
        assert!(store.set("k", "first", None, true).await.unwrap());
        assert!(!store.set("k", "second", None, true).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expires_lazily() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Some(Duration::from_millis(100)), false)
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(store.get("k").await.unwrap(), None);

        // An expired key no longer blocks an if-not-exists write
        assert!(store.set("k", "new", None, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_sorted_set_ordering_and_ranges() {
        let store = MemoryStore::new();
        store.zadd("z", "b", 2.0).await.unwrap();
        store.zadd("z", "a", 1.0).await.unwrap();
        store.zadd("z", "c", 3.0).await.unwrap();

        assert_eq!(store.zcard("z").await.unwrap(), 3);

        let oldest = store.zrange_withscores("z", 0, 0).await.unwrap();
        assert_eq!(oldest, vec![("a".to_string(), 1.0)]);

        let all = store.zrange_withscores("z", 0, -1).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].0, "c");

        assert_eq!(store.zremrangebyscore("z", 1.0, 2.0).await.unwrap(), 2);
        assert_eq!(store.zcard("z").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zrem_exact_member() {
        let store = MemoryStore::new();
        store.zadd("z", "m1", 1.0).await.unwrap();
        store.zadd("z", "m2", 1.0).await.unwrap();

        assert!(store.zrem("z", "m1").await.unwrap());
        assert!(!store.zrem("z", "m1").await.unwrap());
        assert_eq!(store.zcard("z").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_compare_and_delete_requires_match() {
        let store = MemoryStore::new();
        store.set("lock", "token-a", None, false).await.unwrap();

        assert!(!store.compare_and_delete("lock", "token-b").await.unwrap());
        assert_eq!(store.get("lock").await.unwrap().as_deref(), Some("token-a"));

        assert!(store.compare_and_delete("lock", "token-a").await.unwrap());
        assert_eq!(store.get("lock").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compare_and_expire() {
        let store = MemoryStore::new();
        store
            .set("lock", "tok", Some(Duration::from_millis(100)), false)
            .await
            .unwrap();

        assert!(!store
            .compare_and_expire("lock", "wrong", Duration::from_secs(10))
            .await
            .unwrap());
        assert!(store
            .compare_and_expire("lock", "tok", Duration::from_secs(10))
            .await
            .unwrap());

        tokio::time::advance(Duration::from_millis(200)).await;
        // Extended past the original expiry
        assert_eq!(store.get("lock").await.unwrap().as_deref(), Some("tok"));

        let ttl = store.pttl("lock").await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(10));
    }
}

//! Process-wide registry of named circuit breakers
//!
//! Services share one breaker per protected dependency, looked up by name.
//! The registry is an explicit object constructed at application start and
//! passed by reference to consumers — there is no hidden global, which keeps
//! ownership and test isolation explicit.
//!
//! Configuration is first-writer-wins: options passed to
//! [`get_or_create`](CircuitBreakerRegistry::get_or_create) apply only when
//! the breaker is created; later lookups with different options return the
//! existing breaker unchanged.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitStats};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Named-instance cache of circuit breakers.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<RwLock<HashMap<String, CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the breaker for `name`, creating it with `config` on first
    /// use. The config is ignored when the breaker already exists.
    pub fn get_or_create(&self, name: &str, config: CircuitBreakerConfig) -> CircuitBreaker {
        if let Some(existing) = self.get(name) {
            return existing;
        }

        let mut breakers = self.breakers.write().unwrap();
        // Double-check under the write lock: another caller may have won
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(circuit = %name, "registering circuit breaker");
                CircuitBreaker::new(name, config)
            })
            .clone()
    }

    /// Look up an existing breaker without creating one.
    pub fn get(&self, name: &str) -> Option<CircuitBreaker> {
        self.breakers.read().unwrap().get(name).cloned()
    }

    /// Whether a breaker with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.breakers.read().unwrap().contains_key(name)
    }

    /// Remove a breaker by name. Returns whether one was removed.
    pub fn remove(&self, name: &str) -> bool {
        self.breakers.write().unwrap().remove(name).is_some()
    }

    /// All registered breakers.
    pub fn get_all(&self) -> Vec<CircuitBreaker> {
        self.breakers.read().unwrap().values().cloned().collect()
    }

    /// Names of all registered breakers.
    pub fn names(&self) -> Vec<String> {
        self.breakers.read().unwrap().keys().cloned().collect()
    }

    /// Stats snapshot for every registered breaker.
    pub async fn all_stats(&self) -> Vec<(String, CircuitStats)> {
        let breakers = self.get_all();
        let mut stats = Vec::with_capacity(breakers.len());
        for breaker in breakers {
            stats.push((breaker.name().to_string(), breaker.stats().await));
        }
        stats
    }

    /// Reset every registered breaker to closed.
    pub async fn reset_all(&self) {
        for breaker in self.get_all() {
            breaker.reset().await;
        }
    }

    /// Remove all breakers.
    pub fn clear(&self) {
        self.breakers.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_returns_same_breaker() {
        let registry = CircuitBreakerRegistry::new();
        let a = registry.get_or_create("github", CircuitBreakerConfig::default());
        let b = registry.get_or_create("github", CircuitBreakerConfig::default());

        a.force_open().await;
        assert!(!b.is_allowed().await);
    }

    #[test]
    fn test_config_is_first_writer_wins() {
        let registry = CircuitBreakerRegistry::new();
        let first = CircuitBreakerConfig {
            failure_threshold: 7,
            ..Default::default()
        };
        let second = CircuitBreakerConfig {
            failure_threshold: 99,
            reset_timeout: Duration::from_secs(1),
            ..Default::default()
        };

        registry.get_or_create("jira", first);
        let breaker = registry.get_or_create("jira", second);
        assert_eq!(breaker.config().failure_threshold, 7);
    }

    #[test]
    fn test_has_remove_clear() {
        let registry = CircuitBreakerRegistry::new();
        registry.get_or_create("slack", CircuitBreakerConfig::default());
        registry.get_or_create("linear", CircuitBreakerConfig::default());

        assert!(registry.has("slack"));
        assert!(registry.remove("slack"));
        assert!(!registry.has("slack"));
        assert!(!registry.remove("slack"));

        registry.clear();
        assert!(registry.get_all().is_empty());
    }

    #[tokio::test]
    async fn test_all_stats_and_reset_all() {
        let registry = CircuitBreakerRegistry::new();
        let breaker = registry.get_or_create("hubspot", CircuitBreakerConfig::default());
        breaker.force_open().await;

        let stats = registry.all_stats().await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].0, "hubspot");
        assert_eq!(stats[0].1.times_opened, 1);

        registry.reset_all().await;
        assert!(breaker.is_allowed().await);
    }
}

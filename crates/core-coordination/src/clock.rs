//! Wall-clock time source
//!
//! Sliding-window scores and lock TTLs are anchored to Unix epoch
//! milliseconds so that every process sharing the coordination store agrees
//! on the meaning of a timestamp. Monotonic in-process timing (breaker
//! windows, backoff sleeps) stays on `tokio::time`; this module exists only
//! for cross-process timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_is_monotonic_enough() {
        let a = epoch_millis();
        let b = epoch_millis();
        assert!(b >= a);
        // Sanity: later than 2020-01-01
        assert!(a > 1_577_836_800_000);
    }
}

//! Error types for coordination store operations

use thiserror::Error;

/// Errors that can occur talking to the coordination store.
///
/// Rate-limit rejections and lock contention are *not* errors — they are
/// ordinary outcomes surfaced as result values. Errors here mean the store
/// itself misbehaved or was unreachable; they are propagated as-is and never
/// retried automatically (retry policy belongs to the caller).
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// The store rejected or failed an operation
    #[error("store error: {0}")]
    Store(String),

    /// Could not reach the store
    #[error("connection error: {0}")]
    Connection(String),
}

/// Result type for coordination operations
pub type Result<T> = std::result::Result<T, CoordinationError>;

impl From<redis::RedisError> for CoordinationError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            CoordinationError::Connection(e.to_string())
        } else {
            CoordinationError::Store(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CoordinationError::Store("WRONGTYPE".to_string());
        assert!(err.to_string().contains("WRONGTYPE"));

        let err = CoordinationError::Connection("refused".to_string());
        assert!(err.to_string().contains("refused"));
    }
}

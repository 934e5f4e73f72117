//! Error types for circuit-protected calls

use std::time::Duration;
use thiserror::Error;

/// Errors produced by a circuit-protected call.
///
/// The type is generic over the wrapped operation's own error type so that
/// operation failures propagate to the caller unchanged: a caller can match
/// on `CircuitError::Inner` and recover the original error by value.
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// The circuit is open and the call was rejected without being attempted.
    #[error("circuit '{name}' is open, next attempt allowed in {reset_in:?}")]
    Open {
        /// Name of the rejecting circuit
        name: String,
        /// Time remaining until the circuit will allow a trial call
        reset_in: Duration,
    },

    /// The wrapped operation did not complete within the request timeout.
    #[error("circuit '{name}' call timed out after {timeout:?}")]
    Timeout {
        /// Name of the circuit that enforced the timeout
        name: String,
        /// The configured request timeout
        timeout: Duration,
    },

    /// The wrapped operation failed with its own error.
    #[error("circuit call failed: {0}")]
    Inner(E),
}

impl<E> CircuitError<E> {
    /// Whether this error is an open-circuit rejection.
    ///
    /// Rejections are deterministic and instantaneous; retrying one without
    /// waiting out the reset timeout is pointless.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    /// Whether this error is a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitError::Timeout { .. })
    }

    /// Recover the wrapped operation's error, if this is an operation failure.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_is_open() {
        let err: CircuitError<Boom> = CircuitError::Open {
            name: "api".to_string(),
            reset_in: Duration::from_secs(5),
        };
        assert!(err.is_open());
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("api"));
    }

    #[test]
    fn test_into_inner() {
        let err: CircuitError<Boom> = CircuitError::Inner(Boom);
        assert!(err.into_inner().is_some());

        let err: CircuitError<Boom> = CircuitError::Timeout {
            name: "api".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.into_inner().is_none());
    }
}

//! Circuit breaker for protecting calls to unreliable dependencies
//!
//! The circuit breaker prevents cascading failures by failing fast when a
//! dependency is unhealthy. It has three states:
//! - Closed: normal operation, calls pass through
//! - Open: the dependency is unhealthy, calls are rejected immediately
//! - HalfOpen: a limited trial period testing whether the dependency recovered
//!
//! Failures are tracked as individual timestamps pruned to a trailing window,
//! so a burst of old failures never opens the circuit once the window has
//! moved past them. The Open → HalfOpen transition is evaluated lazily at the
//! top of each call rather than by a background timer.
//!
//! # Example
//! ```no_run
//! use ward_core_resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("upstream unavailable")]
//! struct UpstreamError;
//!
//! #[tokio::main]
//! async fn main() {
//!     let breaker = CircuitBreaker::new("payments-api", CircuitBreakerConfig::default());
//!
//!     let result = breaker
//!         .execute(|| async { Ok::<_, UpstreamError>(42) })
//!         .await;
//!
//!     assert_eq!(result.unwrap(), 42);
//! }
//! ```

use crate::error::CircuitError;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Public state of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    /// Circuit is closed, calls pass through normally
    Closed,
    /// Circuit is open, calls are rejected immediately
    Open,
    /// Circuit is half-open, testing dependency recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Classifier deciding whether an error counts toward the failure threshold.
///
/// Returning `false` lets the error propagate to the caller without moving
/// the circuit toward Open — useful for expected errors such as validation
/// rejections from an otherwise healthy dependency.
pub type FailureClassifier = Arc<dyn Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync>;

/// Observer callbacks fired synchronously on circuit events.
///
/// All callbacks run while the caller awaits the protected call; they must
/// not block.
#[derive(Clone, Default)]
pub struct CircuitObservers {
    /// Fired on every state transition with `(circuit, from, to)`
    pub on_state_change: Option<Arc<dyn Fn(&str, CircuitState, CircuitState) + Send + Sync>>,
    /// Fired after every successful call
    pub on_success: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    /// Fired after every counted failure (including timeouts)
    pub on_failure: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl CircuitObservers {
    fn state_change(&self, circuit: &str, from: CircuitState, to: CircuitState) {
        if let Some(ref callback) = self.on_state_change {
            callback(circuit, from, to);
        }
    }

    fn success(&self, circuit: &str) {
        if let Some(ref callback) = self.on_success {
            callback(circuit);
        }
    }

    fn failure(&self, circuit: &str) {
        if let Some(ref callback) = self.on_failure {
            callback(circuit);
        }
    }
}

impl fmt::Debug for CircuitObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitObservers")
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// Configuration for circuit breaker behavior
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Number of failures within `failure_window` before opening the circuit
    pub failure_threshold: usize,

    /// Number of consecutive successes in half-open to close the circuit
    pub success_threshold: usize,

    /// Duration to wait in open before allowing a half-open trial call
    pub reset_timeout: Duration,

    /// Trailing window within which failures count toward the threshold
    pub failure_window: Duration,

    /// Per-call timeout raced against the wrapped operation
    pub request_timeout: Duration,

    /// Classifier deciding whether an error counts as a failure.
    /// `None` means every error counts.
    pub is_failure: Option<FailureClassifier>,

    /// Observer callbacks
    pub observers: CircuitObservers,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            failure_window: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            is_failure: None,
            observers: CircuitObservers::default(),
        }
    }
}

impl fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("reset_timeout", &self.reset_timeout)
            .field("failure_window", &self.failure_window)
            .field("request_timeout", &self.request_timeout)
            .field("is_failure", &self.is_failure.is_some())
            .field("observers", &self.observers)
            .finish()
    }
}

/// Snapshot of circuit breaker counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct CircuitStats {
    /// Total calls attempted through the breaker, including rejections
    pub total: u64,
    /// Calls that completed successfully
    pub succeeded: u64,
    /// Calls that failed and counted toward the threshold
    pub failed: u64,
    /// Calls rejected because the circuit was open
    pub rejected: u64,
    /// Number of times the circuit has transitioned to open
    pub times_opened: u64,
    /// Instant of the last counted failure
    #[serde(skip)]
    pub last_failure: Option<Instant>,
    /// Instant of the last success
    #[serde(skip)]
    pub last_success: Option<Instant>,
}

impl CircuitStats {
    /// Percentage of terminal calls that failed (0.0 when none have finished).
    pub fn failure_rate(&self) -> f64 {
        let terminal = self.succeeded + self.failed;
        if terminal == 0 {
            0.0
        } else {
            self.failed as f64 / terminal as f64 * 100.0
        }
    }
}

/// Internal state, three-valued with the open instant carried in the variant
#[derive(Debug, Clone, Copy)]
enum State {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

impl State {
    fn public(&self) -> CircuitState {
        match self {
            State::Closed => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: State,
    failure_timestamps: VecDeque<Instant>,
    half_open_successes: usize,
    stats: CircuitStats,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: State::Closed,
            failure_timestamps: VecDeque::new(),
            half_open_successes: 0,
            stats: CircuitStats::default(),
        }
    }

    /// Drop failure timestamps older than the trailing window.
    fn prune_window(&mut self, now: Instant, window: Duration) {
        if let Some(cutoff) = now.checked_sub(window) {
            while self
                .failure_timestamps
                .front()
                .is_some_and(|&t| t < cutoff)
            {
                self.failure_timestamps.pop_front();
            }
        }
    }
}

/// Circuit breaker for one named dependency.
///
/// Cheap to clone; clones share the same state. All state mutation happens
/// under a single async mutex, so concurrent callers on the same breaker are
/// safe.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: Arc<CircuitBreakerConfig>,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for a named dependency
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into().into(),
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }

    /// Name of the dependency this breaker protects
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration this breaker was created with
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current public state
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state.public()
    }

    /// Snapshot of the breaker's counters
    pub async fn stats(&self) -> CircuitStats {
        self.inner.lock().await.stats.clone()
    }

    /// Whether a call made right now would be admitted.
    ///
    /// Read-only: does not perform the lazy Open → HalfOpen transition and
    /// does not touch any counters.
    pub async fn is_allowed(&self) -> bool {
        let inner = self.inner.lock().await;
        match inner.state {
            State::Closed | State::HalfOpen => true,
            State::Open { opened_at } => opened_at.elapsed() >= self.config.reset_timeout,
        }
    }

    /// Force the circuit back to closed, clearing failure history and
    /// half-open counters. Administrative; accumulated stats are kept.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let from = inner.state.public();
        inner.state = State::Closed;
        inner.failure_timestamps.clear();
        inner.half_open_successes = 0;
        if from != CircuitState::Closed {
            info!(circuit = %self.name, "circuit reset to closed");
            self.config
                .observers
                .state_change(&self.name, from, CircuitState::Closed);
        }
    }

    /// Administrative override: open the circuit immediately.
    pub async fn force_open(&self) {
        let mut inner = self.inner.lock().await;
        let from = inner.state.public();
        self.open(&mut inner, from, Instant::now());
    }

    /// Execute an operation under circuit protection.
    ///
    /// - Open circuit with an unexpired reset timeout: the operation is never
    ///   invoked and `CircuitError::Open` carries the remaining wait.
    /// - The operation races the configured `request_timeout`; losing the race
    ///   yields `CircuitError::Timeout` and counts as a failure. The future is
    ///   dropped at that point, but work it started remotely may still run to
    ///   completion on the other side.
    /// - Operation errors are classified; unclassified errors propagate in
    ///   `CircuitError::Inner` without counting toward the threshold.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        if let Some(reset_in) = self.admit().await {
            return Err(CircuitError::Open {
                name: self.name.to_string(),
                reset_in,
            });
        }

        match tokio::time::timeout(self.config.request_timeout, op()).await {
            Err(_elapsed) => {
                self.record_failure().await;
                Err(CircuitError::Timeout {
                    name: self.name.to_string(),
                    timeout: self.config.request_timeout,
                })
            }
            Ok(Ok(value)) => {
                self.record_success().await;
                Ok(value)
            }
            Ok(Err(e)) => {
                let counted = match self.config.is_failure {
                    Some(ref classify) => classify(&e),
                    None => true,
                };
                if counted {
                    self.record_failure().await;
                } else {
                    debug!(circuit = %self.name, error = %e, "error not counted as failure");
                }
                Err(CircuitError::Inner(e))
            }
        }
    }

    /// Like [`execute`](Self::execute), but an open-circuit rejection returns
    /// the fallback's value instead of an error. The rejection is still
    /// recorded in stats.
    pub async fn execute_with_fallback<F, Fut, T, E, FB>(
        &self,
        op: F,
        fallback: FB,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
        FB: FnOnce() -> T,
    {
        match self.execute(op).await {
            Err(CircuitError::Open { .. }) => Ok(fallback()),
            other => other,
        }
    }

    /// Admission check run at the top of every call. Returns the remaining
    /// reset wait when the call is rejected, performing the lazy
    /// Open → HalfOpen transition when the timeout has elapsed.
    async fn admit(&self) -> Option<Duration> {
        let mut inner = self.inner.lock().await;
        inner.stats.total += 1;

        match inner.state {
            State::Closed | State::HalfOpen => None,
            State::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= self.config.reset_timeout {
                    inner.state = State::HalfOpen;
                    inner.half_open_successes = 0;
                    info!(circuit = %self.name, "circuit half-open, probing dependency");
                    self.config.observers.state_change(
                        &self.name,
                        CircuitState::Open,
                        CircuitState::HalfOpen,
                    );
                    None
                } else {
                    inner.stats.rejected += 1;
                    debug!(circuit = %self.name, "call rejected, circuit open");
                    Some(self.config.reset_timeout - elapsed)
                }
            }
        }
    }

    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.stats.succeeded += 1;
        inner.stats.last_success = Some(Instant::now());

        if let State::HalfOpen = inner.state {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.config.success_threshold {
                inner.state = State::Closed;
                inner.half_open_successes = 0;
                inner.failure_timestamps.clear();
                info!(circuit = %self.name, "circuit closed, dependency recovered");
                self.config.observers.state_change(
                    &self.name,
                    CircuitState::HalfOpen,
                    CircuitState::Closed,
                );
            }
        }

        self.config.observers.success(&self.name);
    }

    async fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.stats.failed += 1;
        inner.stats.last_failure = Some(now);

        match inner.state {
            State::HalfOpen => {
                // A single failure during the trial period reopens immediately
                self.open(&mut inner, CircuitState::HalfOpen, now);
            }
            State::Closed => {
                inner.failure_timestamps.push_back(now);
                inner.prune_window(now, self.config.failure_window);
                if inner.failure_timestamps.len() >= self.config.failure_threshold {
                    self.open(&mut inner, CircuitState::Closed, now);
                }
            }
            State::Open { .. } => {
                // In-flight call admitted before the circuit opened; the
                // window keeps the timestamp for when we go half-open.
                inner.failure_timestamps.push_back(now);
            }
        }

        self.config.observers.failure(&self.name);
    }

    fn open(&self, inner: &mut Inner, from: CircuitState, now: Instant) {
        inner.state = State::Open { opened_at: now };
        inner.half_open_successes = 0;
        inner.stats.times_opened += 1;
        warn!(
            circuit = %self.name,
            reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
            "circuit opened"
        );
        self.config
            .observers
            .state_change(&self.name, from, CircuitState::Open);
    }
}

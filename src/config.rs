use crate::events::{CircuitBreakerEvent, EventListeners, FnListener};
use crate::{CircuitBreaker, CircuitState};
use std::time::Duration;

/// Configuration for a circuit breaker.
///
/// Immutable after construction. The `Default` impl carries the documented
/// defaults; use [`CircuitBreakerConfig::builder`] to customize.
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: usize,
    pub(crate) reset_timeout: Duration,
    pub(crate) success_threshold: usize,
    pub(crate) event_listeners: EventListeners,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(10),
            success_threshold: 2,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: usize,
    reset_timeout: Duration,
    success_threshold: usize,
    event_listeners: EventListeners,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            reset_timeout: defaults.reset_timeout,
            success_threshold: defaults.success_threshold,
            event_listeners: defaults.event_listeners,
            name: defaults.name,
        }
    }

    /// Sets the number of consecutive failures that opens the circuit.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Sets the duration the circuit remains open before a probe is
    /// permitted.
    ///
    /// Default: 10 seconds
    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.reset_timeout = duration;
        self
    }

    /// Sets the number of consecutive successes in half-open that closes the
    /// circuit.
    ///
    /// Default: 2
    pub fn success_threshold(mut self, n: usize) -> Self {
        self.success_threshold = n;
        self
    }

    /// Give this breaker a human-readable name for diagnostics.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers an [`EventListener`] that receives every
    /// [`CircuitBreakerEvent`].
    ///
    /// The `on_*` hooks below cover the common cases; use this for listeners
    /// that need to see all event kinds.
    ///
    /// [`EventListener`]: crate::EventListener
    pub fn event_listener<L>(mut self, listener: L) -> Self
    where
        L: crate::EventListener + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Registers a callback for state transitions.
    ///
    /// Called with the state the circuit is transitioning from and the state
    /// it is transitioning to.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback for each call permitted through the breaker.
    ///
    /// Called with the state the circuit was in when the call was admitted,
    /// `Closed` or `HalfOpen`.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for each call rejected while the circuit is open.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for each successful outcome recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for each failed outcome recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Builds the configuration and returns a [`CircuitBreaker`].
    ///
    /// # Panics
    ///
    /// Panics if `failure_threshold` or `success_threshold` is zero.
    pub fn build(self) -> CircuitBreaker {
        assert!(
            self.failure_threshold >= 1,
            "failure_threshold must be at least 1"
        );
        assert!(
            self.success_threshold >= 1,
            "success_threshold must be at least 1"
        );

        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            success_threshold: self.success_threshold,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use std::fmt;
use std::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CircuitState {
    /// The circuit is closed and calls are allowed.
    Closed,
    /// The circuit is open and calls are rejected.
    Open,
    /// The circuit is half-open and probe calls are allowed.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => f.write_str("closed"),
            CircuitState::Open => f.write_str("open"),
            CircuitState::HalfOpen => f.write_str("half-open"),
        }
    }
}

/// The guarded state block: state, both consecutive counters, and the
/// timestamp of the most recent transition. Every access goes through the
/// `RwLock` owned by [`CircuitBreaker`]; nothing here is synchronized on
/// its own.
///
/// [`CircuitBreaker`]: crate::CircuitBreaker
pub(crate) struct Circuit {
    state: CircuitState,
    last_state_change: Instant,
    failure_count: usize,
    success_count: usize,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            last_state_change: Instant::now(),
            failure_count: 0,
            success_count: 0,
        }
    }
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Read-path admission check, valid under the shared lock.
    ///
    /// Returns `None` when the open interval has elapsed: the caller must
    /// retry with [`Circuit::try_acquire`] under the exclusive lock, which
    /// re-evaluates the timeout and performs the transition atomically.
    pub fn try_acquire_shared(&self, config: &CircuitBreakerConfig) -> Option<bool> {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        breaker_name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                Some(true)
            }
            CircuitState::Open => {
                if self.last_state_change.elapsed() < config.reset_timeout {
                    config
                        .event_listeners
                        .emit(&CircuitBreakerEvent::CallRejected {
                            breaker_name: config.name.clone(),
                            timestamp: Instant::now(),
                        });
                    Some(false)
                } else {
                    None
                }
            }
        }
    }

    /// Write-path admission check. Performs the lazy open -> half-open
    /// transition when the reset timeout has elapsed. The elapsed check and
    /// the transition happen under the same exclusive lock, so two racing
    /// probes cannot disagree about who transitioned; both are still
    /// admitted, since half-open always permits probes.
    pub fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        breaker_name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                true
            }
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= config.reset_timeout {
                    self.transition_to(CircuitState::HalfOpen, config);
                    config
                        .event_listeners
                        .emit(&CircuitBreakerEvent::CallPermitted {
                            breaker_name: config.name.clone(),
                            timestamp: Instant::now(),
                            state: self.state,
                        });
                    true
                } else {
                    config
                        .event_listeners
                        .emit(&CircuitBreakerEvent::CallRejected {
                            breaker_name: config.name.clone(),
                            timestamp: Instant::now(),
                        });
                    false
                }
            }
            CircuitState::HalfOpen => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        breaker_name: config.name.clone(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                true
            }
        }
    }

    pub fn record_success(&mut self, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                breaker_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });

        match self.state {
            CircuitState::Closed => {
                // One success clears the failure streak.
                self.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.success_threshold {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            // Results arriving while open are not counted. They can only
            // occur for calls admitted before the circuit opened.
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                breaker_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });

        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::HalfOpen => {
                // Any failure during probation reopens the circuit.
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                breaker_name: config.name.clone(),
                timestamp: Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = %from_state, to = %state, "Circuit state transition");

        self.state = state;
        self.last_state_change = Instant::now();
        self.success_count = 0;
        self.failure_count = 0;
    }
}

//! Circuit breaker for synchronous calls to unreliable operations.
//!
//! A circuit breaker prevents cascading failures by tracking the outcomes of
//! calls to a downstream operation and temporarily rejecting calls once
//! consecutive failures exceed a threshold, giving the downstream system time
//! to recover.
//!
//! ## States
//! - **Closed**: Normal operation, all calls pass through; consecutive
//!   failures are counted and one success clears the streak
//! - **Open**: Circuit is tripped, calls are rejected immediately until the
//!   reset timeout elapses
//! - **Half-Open**: Testing recovery; probe calls are allowed, one failure
//!   reopens, enough consecutive successes close
//!
//! There is no background timer: the open -> half-open transition fires
//! lazily on the first call after the reset timeout expires.
//!
//! ## Usage
//!
//! ```rust
//! use circuit_breaker::{CircuitBreaker, CircuitBreakerError};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::builder()
//!     .failure_threshold(3)
//!     .reset_timeout(Duration::from_secs(5))
//!     .success_threshold(2)
//!     .build();
//!
//! match breaker.call(|| fetch_quote()) {
//!     Ok(quote) => println!("quote: {quote}"),
//!     Err(CircuitBreakerError::OpenCircuit) => {
//!         eprintln!("circuit is open, backing off");
//!     }
//!     Err(CircuitBreakerError::Inner(e)) => {
//!         eprintln!("downstream error: {e}");
//!     }
//! }
//!
//! fn fetch_quote() -> Result<String, std::io::Error> {
//!     Ok("ok".to_string())
//! }
//! ```
//!
//! ## Manual control
//!
//! Callers that cannot route through [`CircuitBreaker::call`] can drive the
//! breaker directly:
//!
//! ```rust
//! use circuit_breaker::{CircuitBreaker, CircuitState};
//!
//! let breaker = CircuitBreaker::builder().build();
//!
//! if breaker.allow_request() {
//!     let success = true; // outcome of the guarded work
//!     breaker.record_result(success);
//! }
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! ```
//!
//! ## Event listeners
//!
//! ```rust
//! use circuit_breaker::CircuitBreaker;
//!
//! let breaker = CircuitBreaker::builder()
//!     .name("payments")
//!     .on_state_transition(|from, to| {
//!         println!("payments breaker: {from} -> {to}");
//!     })
//!     .on_call_rejected(|| {
//!         println!("payments breaker rejected a call");
//!     })
//!     .build();
//! # let _ = breaker;
//! ```
//!
//! ## Concurrency
//!
//! [`CircuitBreaker`] is `Send + Sync`, and cloning it is cheap: clones share
//! the same underlying circuit, so a breaker can be handed to worker threads
//! directly. Reads ([`allow_request`], [`state`]) take a shared lock;
//! recording outcomes and the lazy open -> half-open transition take the
//! exclusive side of the same lock, so no caller ever observes a torn
//! transition. Multiple concurrent probes may be admitted while half-open;
//! that is intentional, since half-open always allows requests.
//!
//! ## Feature Flags
//! - `tracing`: log admission decisions and state transitions via the
//!   `tracing` crate
//! - `serde`: enables `Serialize` for [`CircuitState`]
//!
//! [`allow_request`]: CircuitBreaker::allow_request
//! [`state`]: CircuitBreaker::state

use parking_lot::RwLock;
use std::sync::Arc;
#[cfg(feature = "tracing")]
use tracing::debug;

use crate::circuit::Circuit;

pub use circuit::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::{CircuitBreakerEvent, EventListener, EventListeners, FnListener};

mod circuit;
mod config;
mod error;
mod events;

/// A guard around calls to an unreliable operation.
///
/// Owns the circuit state machine and synchronizes all access to it. Create
/// one with [`CircuitBreaker::builder`] (or [`CircuitBreaker::new`] for the
/// default configuration) and keep it for the lifetime of the downstream
/// dependency it protects.
pub struct CircuitBreaker {
    circuit: Arc<RwLock<Circuit>>,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreaker {
    /// Creates a new breaker from the given configuration, starting closed
    /// with both counters at zero.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            circuit: Arc::new(RwLock::new(Circuit::new())),
            config: Arc::new(config),
        }
    }

    /// Returns a new builder with the default configuration.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Invokes `operation` through the breaker.
    ///
    /// If the circuit rejects the call, returns
    /// [`CircuitBreakerError::OpenCircuit`] without invoking the operation.
    /// Otherwise the operation runs exactly once, synchronously, its outcome
    /// is recorded, and its own result is propagated: the success value
    /// unchanged, or the error verbatim inside
    /// [`CircuitBreakerError::Inner`].
    ///
    /// The breaker imposes no timeout and performs no retries; if the
    /// operation hangs, `call` hangs with it.
    pub fn call<T, E, F>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if !self.allow_request() {
            return Err(CircuitBreakerError::OpenCircuit);
        }

        let result = operation();
        self.record_result(result.is_ok());

        result.map_err(CircuitBreakerError::Inner)
    }

    /// Returns whether a call may proceed right now.
    ///
    /// Always true while closed or half-open. While open, true only once the
    /// reset timeout has elapsed; the first such probe transitions the
    /// circuit to half-open as a side effect.
    pub fn allow_request(&self) -> bool {
        let verdict = {
            let circuit = self.circuit.read();
            circuit.try_acquire_shared(&self.config)
        };

        let permitted = match verdict {
            Some(permitted) => permitted,
            // The open interval elapsed: redo the check under the exclusive
            // lock, where the check and the transition are atomic.
            None => self.circuit.write().try_acquire(&self.config),
        };

        #[cfg(feature = "tracing")]
        if permitted {
            debug!(breaker = %self.config.name, "circuit breaker permitted call");
        } else {
            debug!(breaker = %self.config.name, "circuit breaker rejected call (circuit open)");
        }

        permitted
    }

    /// Records the outcome of a call made after [`allow_request`] admitted
    /// it.
    ///
    /// Outcomes recorded while the circuit is open are ignored; they can only
    /// occur for calls that were admitted before the circuit opened.
    ///
    /// [`allow_request`]: CircuitBreaker::allow_request
    pub fn record_result(&self, success: bool) {
        let mut circuit = self.circuit.write();
        if success {
            circuit.record_success(&self.config);
        } else {
            circuit.record_failure(&self.config);
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> CircuitState {
        self.circuit.read().state()
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Forces the circuit into the open state.
    pub fn force_open(&self) {
        self.circuit.write().force_open(&self.config);
    }

    /// Forces the circuit into the closed state.
    pub fn force_closed(&self) {
        self.circuit.write().force_closed(&self.config);
    }

    /// Resets the circuit to the closed state and clears the counters.
    pub fn reset(&self) {
        self.circuit.write().reset(&self.config);
    }

    /// Returns the breaker's configured name.
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl Clone for CircuitBreaker {
    /// Clones share the same underlying circuit: tripping the breaker
    /// through one clone opens it for all.
    fn clone(&self) -> Self {
        Self {
            circuit: Arc::clone(&self.circuit),
            config: Arc::clone(&self.config),
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish()
    }
}

use thiserror::Error;

/// Errors returned by [`CircuitBreaker::call`].
///
/// [`CircuitBreaker::call`]: crate::CircuitBreaker::call
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the operation was never invoked.
    #[error("circuit is open; call not permitted")]
    OpenCircuit,

    /// An error returned by the wrapped operation, passed through verbatim.
    #[error("operation error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the error indicates the circuit is open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit)
    }

    /// Returns the operation's own error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<E> for CircuitBreakerError<E> {
    fn from(err: E) -> Self {
        CircuitBreakerError::Inner(err)
    }
}

//! A breaker guarding a flaky downstream service.
//!
//! The service fails its first 10 calls, then recovers. With a 3 second
//! reset timeout the breaker opens after 5 consecutive failures, rejects
//! calls while open, probes once the timeout elapses, and closes again once
//! the service is healthy.
//!
//! Run with:
//! ```sh
//! cargo run --example unstable_service
//! ```
//!
//! Add `--features tracing` to also see the breaker's own transition logs.

use circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use std::thread::sleep;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt::init();

    let breaker = CircuitBreaker::builder()
        .name("unstable-service")
        .reset_timeout(Duration::from_secs(3))
        .on_state_transition(|from, to| {
            println!("  breaker transition: {from} -> {to}");
        })
        .build();

    let mut call_count = 0u32;

    for attempt in 1..=15 {
        println!("Attempt {attempt}:");
        println!("  circuit state: {}", breaker.state());

        let result = breaker.call(|| {
            call_count += 1;
            if call_count <= 10 {
                Err("service is unavailable")
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => println!("  service call succeeded"),
            Err(CircuitBreakerError::OpenCircuit) => {
                println!("  circuit is open, request rejected");
            }
            Err(CircuitBreakerError::Inner(err)) => {
                println!("  service call failed: {err}");
            }
        }

        sleep(Duration::from_secs(1));
    }
}

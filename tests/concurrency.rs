//! Thread safety: shared state across clones, admission under contention,
//! and atomicity of the lazy open -> half-open transition.

use circuit_breaker::{CircuitBreaker, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn breaker_is_send_and_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<CircuitBreaker>();
    assert_sync::<CircuitBreaker>();
}

/// Failure counting loses no updates under contention: with the threshold
/// set to exactly the total number of recorded failures, the circuit must
/// end up open.
#[test]
fn concurrent_failures_are_all_counted() {
    const THREADS: usize = 8;
    const FAILURES_PER_THREAD: usize = 50;

    let breaker = CircuitBreaker::builder()
        .failure_threshold(THREADS * FAILURES_PER_THREAD)
        .reset_timeout(Duration::from_secs(60))
        .build();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let breaker = breaker.clone();
            thread::spawn(move || {
                for _ in 0..FAILURES_PER_THREAD {
                    breaker.record_result(false);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(breaker.state(), CircuitState::Open);
}

/// With one more failure required than will ever be recorded, the circuit
/// must stay closed no matter the interleaving.
#[test]
fn concurrent_failures_below_threshold_stay_closed() {
    const THREADS: usize = 8;
    const FAILURES_PER_THREAD: usize = 50;

    let breaker = CircuitBreaker::builder()
        .failure_threshold(THREADS * FAILURES_PER_THREAD + 1)
        .reset_timeout(Duration::from_secs(60))
        .build();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let breaker = breaker.clone();
            thread::spawn(move || {
                for _ in 0..FAILURES_PER_THREAD {
                    breaker.record_result(false);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Concurrent callers hammering a failing operation: once the circuit
/// opens, calls stop reaching the operation, so the invocation count stays
/// below the total attempt count.
#[test]
fn open_circuit_sheds_load_under_contention() {
    const THREADS: usize = 8;
    const ATTEMPTS_PER_THREAD: usize = 100;

    let invoked = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let breaker = CircuitBreaker::builder()
        .failure_threshold(5)
        .reset_timeout(Duration::from_secs(60))
        .build();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let breaker = breaker.clone();
            let invoked = Arc::clone(&invoked);
            let rejected = Arc::clone(&rejected);
            thread::spawn(move || {
                for _ in 0..ATTEMPTS_PER_THREAD {
                    let invoked = Arc::clone(&invoked);
                    let result = breaker.call(move || {
                        invoked.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>("failure")
                    });
                    if let Err(e) = result {
                        if e.is_circuit_open() {
                            rejected.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(breaker.state(), CircuitState::Open);
    let total = THREADS * ATTEMPTS_PER_THREAD;
    let invoked = invoked.load(Ordering::SeqCst);
    let rejected = rejected.load(Ordering::SeqCst);
    assert_eq!(invoked + rejected, total);
    assert!(
        rejected > 0,
        "circuit never shed load: {invoked} of {total} calls invoked"
    );
}

/// Probes racing on an expired open interval: all are admitted (half-open
/// tolerates concurrent probes) and exactly one transition fires.
#[test]
fn racing_expired_probes_are_all_admitted() {
    const THREADS: usize = 8;

    let transitions = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&transitions);

    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .reset_timeout(Duration::from_millis(30))
        .on_state_transition(move |_, to| {
            if to == CircuitState::HalfOpen {
                t.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    let _ = breaker.call(|| Err::<(), _>("failure"));
    assert_eq!(breaker.state(), CircuitState::Open);

    thread::sleep(Duration::from_millis(50));

    let admitted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let breaker = breaker.clone();
            let admitted = Arc::clone(&admitted);
            thread::spawn(move || {
                if breaker.allow_request() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(admitted.load(Ordering::SeqCst), THREADS);
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert_eq!(transitions.load(Ordering::SeqCst), 1);
}

/// Readers observing state while writers drive transitions only ever see
/// the three legitimate states, never a torn intermediate.
#[test]
fn state_snapshots_are_never_torn() {
    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .reset_timeout(Duration::from_millis(1))
        .success_threshold(1)
        .build();

    let done = Arc::new(AtomicUsize::new(0));

    let writer = {
        let breaker = breaker.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..500 {
                let _ = breaker.call(move || {
                    if i % 2 == 0 {
                        Err::<(), _>("failure")
                    } else {
                        Ok(())
                    }
                });
            }
            done.store(1, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let breaker = breaker.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0usize;
                while done.load(Ordering::SeqCst) == 0 {
                    match breaker.state() {
                        CircuitState::Closed | CircuitState::Open | CircuitState::HalfOpen => {
                            observed += 1;
                        }
                    }
                }
                observed
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

use crossbeam_channel::{bounded, select, tick};
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

/// Throughput counters shared by workers and the reporter.
///
/// Totals can exceed 64-bit range for large array lengths, so these are
/// arbitrary-precision and guarded by a mutex rather than atomics.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub processed_since_tick: BigUint,
    pub processed_total: BigUint,
    pub remaining: BigUint,
}

pub type SharedCounters = Arc<Mutex<Counters>>;

pub fn new_shared(remaining: BigUint) -> SharedCounters {
    Arc::new(Mutex::new(Counters {
        remaining,
        ..Counters::default()
    }))
}

/// Lock the counters, tolerating a poisoned mutex from a panicked worker.
pub fn lock(counters: &SharedCounters) -> MutexGuard<'_, Counters> {
    counters.lock().unwrap_or_else(|e| e.into_inner())
}

impl Counters {
    pub fn record_processed(&mut self) {
        self.processed_since_tick += 1u32;
        self.processed_total += 1u32;
        if !self.remaining.is_zero() {
            self.remaining -= 1u32;
        }
    }
}

/// Periodic throughput reporter. Read-only with respect to the pipeline:
/// it takes the counter lock briefly each tick and never blocks a send
/// or receive.
pub struct ProgressReporter {
    stop_tx: crossbeam_channel::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    pub fn start(counters: SharedCounters, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = std::thread::spawn(move || {
            let ticker = tick(interval);
            let secs = interval.as_secs().max(1);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let mut c = counters.lock().unwrap_or_else(|e| e.into_inner());
                        let per_second = &c.processed_since_tick / BigUint::from(secs);
                        info!(
                            processed = %c.processed_total,
                            remaining = %c.remaining,
                            per_second = %per_second,
                            "search progress"
                        );
                        c.processed_since_tick = BigUint::zero();
                    }
                    recv(stop_rx) -> _ => break,
                }
            }
        });
        Self { stop_tx, handle }
    }

    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_processed_moves_all_three_counters() {
        let shared = new_shared(BigUint::from(3u32));
        {
            let mut c = lock(&shared);
            c.record_processed();
            c.record_processed();
        }
        let c = lock(&shared);
        assert_eq!(c.processed_total, BigUint::from(2u32));
        assert_eq!(c.processed_since_tick, BigUint::from(2u32));
        assert_eq!(c.remaining, BigUint::from(1u32));
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let shared = new_shared(BigUint::from(1u32));
        let mut c = lock(&shared);
        c.record_processed();
        c.record_processed();
        assert!(c.remaining.is_zero());
    }

    #[test]
    fn reporter_stops_cleanly() {
        let shared = new_shared(BigUint::zero());
        let reporter = ProgressReporter::start(shared, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(35));
        reporter.stop();
    }
}

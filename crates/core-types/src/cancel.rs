//! Cooperative cancellation.
//!
//! The flag is set from outside the core (a signal handler, a test thread);
//! the core polls it at its checkpoints and between sleep slices, giving
//! cancellation a bounded response latency of roughly one slice even in the
//! middle of a long backoff delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Slice length for interruptible sleeps.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of an interruptible sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The full duration elapsed.
    Completed,
    /// Cancellation was observed before the duration elapsed.
    Interrupted,
}

/// Clonable handle to the process-wide "please stop" condition.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking query; safe to poll at high frequency.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Request cancellation.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Drain a pending request once shutdown is underway.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// The underlying atomic, for registration with a signal handler.
    pub fn shared(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }

    /// Sleep for `total`, checking the flag between [`POLL_INTERVAL`] slices
    /// and returning early the first time it is observed set.
    pub fn sleep(&self, total: Duration) -> SleepOutcome {
        let mut remaining = total;
        while remaining > Duration::ZERO {
            if self.is_requested() {
                return SleepOutcome::Interrupted;
            }
            let slice = remaining.min(POLL_INTERVAL);
            thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        if self.is_requested() {
            SleepOutcome::Interrupted
        } else {
            SleepOutcome::Completed
        }
    }
}

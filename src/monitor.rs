//! Sticky-signal monitor.
//!
//! A [`Monitor`] is a latch guarded by a lock and a condition variable. The
//! signaled state lives in the monitor itself rather than only in wake
//! events, so a `signal` that happens before a `wait` is never lost.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A latch-based wait/notify primitive that remembers whether it has fired
#[derive(Debug, Default)]
pub struct Monitor {
    signaled: Mutex<bool>,
    condition: Condvar,
}

impl Monitor {
    /// Create an unsignaled monitor
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condition: Condvar::new(),
        }
    }

    /// Set the flag and wake every waiter. Idempotent.
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.condition.notify_all();
    }

    /// Clear the flag so the monitor can be waited on again
    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Block until the flag is set. Returns immediately if it already is.
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.condition.wait(&mut signaled);
        }
    }

    /// Block until the flag is set or `timeout` elapses.
    /// Returns whether the monitor was signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self
                .condition
                .wait_until(&mut signaled, deadline)
                .timed_out()
            {
                return *signaled;
            }
        }
        true
    }

    /// Read the flag without blocking
    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }
}

//! Reclamation and Collection
//!
//! Retired values are never freed on their own. Two background threads turn
//! them back into memory:
//!
//! ```text
//!   caller ──retire──> bucket.reclaimable
//!                            │
//!                            │  Accountant: every pass, per bucket, eat up to
//!                            │  `reclaim_batch` terms into bucket.garbage
//!                            ▼
//!                      bucket.garbage ── running total ≥ threshold ──┐
//!                                                                    │ signal
//!   garbage_collect() ───────────────────────────────────────────────┤
//!                                                                    ▼
//!                                   Collector: per bucket, copy live entries
//!                                   into a fresh arena and drop the old one
//! ```
//!
//! Per bucket the lifecycle of a value is
//! `Live → (retire) → Pending → (collection) → Freed`.

mod accountant;
mod collector;

pub(crate) use accountant::accountant_loop;
pub(crate) use collector::collector_loop;

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Wakes the collector.
///
/// The flag survives until the collector consumes it, so a request made while
/// a cycle is running produces one more cycle instead of being lost.
#[derive(Debug, Default)]
pub(crate) struct GcSignal {
    requested: Mutex<bool>,
    cond: Condvar,
}

impl GcSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Asks for a collection cycle.
    pub(crate) fn request(&self) {
        *self.requested.lock() = true;
        self.cond.notify_one();
    }

    /// Wakes the collector without requesting a cycle (used at shutdown).
    pub(crate) fn wake_all(&self) {
        let _guard = self.requested.lock();
        self.cond.notify_all();
    }
}

/// Interruptible sleep for the accountant.
#[derive(Debug, Default)]
pub(crate) struct Idle {
    lock: Mutex<()>,
    cond: Condvar,
}

impl Idle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sleeps for up to `interval`, returning early if woken. `keep_waiting`
    /// is checked under the lock so a wake-up cannot slip in before the wait.
    pub(crate) fn sleep(&self, interval: Duration, keep_waiting: impl Fn() -> bool) {
        let mut guard = self.lock.lock();
        if keep_waiting() {
            self.cond.wait_for(&mut guard, interval);
        }
    }

    pub(crate) fn wake_all(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }
}

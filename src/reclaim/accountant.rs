//! Reclamation Accountant
//!
//! A background thread that walks every bucket once per pass, moving a few
//! retired values from the bucket's reclamation list into its garbage
//! estimate. Working in small slices keeps each bucket lock short, so
//! accounting never shows up in caller-facing latency.
//!
//! ## Design
//!
//! Each pass:
//! 1. For each bucket, take its write lock and account up to `reclaim_batch`
//!    retired terms
//! 2. Add the bucket's garbage counter to the pass's running total
//! 3. Once the running total reaches `reclaim_threshold`, wake the collector
//! 4. Sleep `reclaim_interval` (woken early on shutdown)

use crate::storage::table::TableCore;
use std::sync::Arc;
use tracing::{debug, trace};

/// What one accountant pass saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PassSummary {
    /// Retired terms moved into garbage counters this pass
    pub(crate) accounted: usize,
    /// Sum of the garbage counters of every bucket visited
    pub(crate) running_total: u64,
    /// Whether the collector was woken
    pub(crate) signalled: bool,
}

/// Runs one pass over every bucket.
pub(crate) fn account_pass(core: &TableCore) -> PassSummary {
    let mut summary = PassSummary::default();

    for bucket in core.buckets.iter() {
        {
            let mut state = bucket.write();
            summary.accounted += state.account(core.config.reclaim_batch);
            summary.running_total += state.garbage;
        }

        if !summary.signalled && summary.running_total >= core.config.reclaim_threshold {
            core.gc_signal.request();
            summary.signalled = true;
        }
    }

    summary
}

/// The accountant thread body.
pub(crate) fn accountant_loop(core: Arc<TableCore>) {
    debug!(table = %core.name, "Reclamation accountant started");

    while core.is_running() {
        let summary = account_pass(&core);
        if summary.accounted > 0 {
            trace!(
                table = %core.name,
                accounted = summary.accounted,
                garbage = summary.running_total,
                signalled = summary.signalled,
                "Accountant pass"
            );
        }

        core.idle
            .sleep(core.config.reclaim_interval, || core.is_running());
    }

    debug!(table = %core.name, "Reclamation accountant stopped");
}

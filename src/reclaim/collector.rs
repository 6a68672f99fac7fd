//! Copying Collector
//!
//! Sleeps until it is asked for a cycle (by the accountant or by
//! `garbage_collect`) or until the table's garbage estimate reaches the
//! reclaim threshold. A cycle visits buckets one at a time: under the bucket's
//! write lock, every live entry is copied into a fresh arena, the garbage
//! counter and reclamation list are reset, and the old arena is dropped along
//! with everything retired in it.
//!
//! Only one bucket is paused at a time; the cycle as a whole is not atomic
//! across buckets.

use crate::storage::table::TableCore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// What one collection cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CycleSummary {
    pub(crate) live_entries: usize,
    pub(crate) freed_nodes: usize,
}

/// Runs one collection cycle over every bucket.
pub(crate) fn collect(core: &TableCore) -> CycleSummary {
    let mut summary = CycleSummary::default();
    for bucket in core.buckets.iter() {
        let compaction = bucket.write().compact();
        summary.live_entries += compaction.live_entries;
        summary.freed_nodes += compaction.nodes_before - compaction.nodes_after;
    }
    summary
}

/// Blocks until a cycle is due. Returns `false` once the table is shutting down.
fn wait_for_work(core: &TableCore) -> bool {
    let signal = &core.gc_signal;
    let mut requested = signal.requested.lock();
    loop {
        if !core.is_running() {
            return false;
        }
        if *requested || core.garbage_size() >= core.config.reclaim_threshold {
            *requested = false;
            return true;
        }
        signal.cond.wait(&mut requested);
    }
}

/// The collector thread body.
pub(crate) fn collector_loop(core: Arc<TableCore>) {
    debug!(table = %core.name, "Collector started");

    while wait_for_work(&core) {
        let started = Instant::now();
        let summary = collect(&core);
        core.stats.collections.fetch_add(1, Ordering::Relaxed);

        debug!(
            table = %core.name,
            buckets = core.buckets.len(),
            live = summary.live_entries,
            freed_nodes = summary.freed_nodes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collection cycle complete"
        );
    }

    debug!(table = %core.name, "Collector stopped");
}

//! Sharded Table
//!
//! This module implements the table callers talk to: a fixed array of
//! [`Bucket`]s, routing from integer keys to buckets, the point and positional
//! operations, and ownership of the three background threads.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌───────────────────────────────── Table ─────────────────────────────────┐
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐           ┌──────────┐          │
//! │  │ Bucket 0 │ │ Bucket 1 │ │ Bucket 2 │    ...    │ Bucket N │          │
//! │  │ RwLock   │ │ RwLock   │ │ RwLock   │           │ RwLock   │          │
//! │  │ Arena g0 │ │ Arena g3 │ │ Arena g1 │           │ Arena g7 │          │
//! │  └──────────┘ └──────────┘ └──────────┘           └──────────┘          │
//! │        ▲ one at a time            ▲ one at a time         ▲ all (Empty)  │
//! │  ┌─────┴──────┐  ┌──────────┐ ┌───┴────────┐                            │
//! │  │ Accountant │─>│Collector │ │ Dispatcher │<── dump / drain jobs        │
//! │  └────────────┘  └──────────┘ └────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - Point operations lock exactly one bucket for their whole duration.
//! - `empty` locks every bucket, in index order, before touching any of them.
//! - The collector and dispatcher hold at most one bucket lock at a time.
//!
//! Keys are pre-hashed integers chosen by the caller; the table never compares
//! values for key equality. Two values the caller considers equal must map to
//! the same key upstream.

use crate::batch::{self, BatchJob, BatchKind, BatchQueue, BatchTicket, Caller};
use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::reclaim::{self, GcSignal, Idle};
use crate::storage::bucket::Bucket;
use crate::storage::record::RecordUpdate;
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Operation counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pub(crate) inserts: AtomicU64,
    pub(crate) gets: AtomicU64,
    pub(crate) deletes: AtomicU64,
    pub(crate) updates: AtomicU64,
    pub(crate) collections: AtomicU64,
    pub(crate) batch_jobs: AtomicU64,
}

/// Table statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Total Insert and InsertNew operations
    pub inserts: u64,
    /// Total Get operations
    pub gets: u64,
    /// Total Delete operations
    pub deletes: u64,
    /// Total positional updates (Increment, Unshift, Shift, Swap)
    pub updates: u64,
    /// Completed collection cycles
    pub collections: u64,
    /// Completed Dump and Drain jobs
    pub batch_jobs: u64,
}

/// Memory usage information, gathered one bucket at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Live entries
    pub entries: usize,
    /// Nodes held by all current arenas, live or retired
    pub arena_nodes: usize,
    /// Approximate bytes held by all current arenas
    pub arena_bytes: u64,
    /// Retired values not yet accounted into the garbage estimate
    pub pending_reclaim: usize,
}

/// State shared between a table and its background threads.
pub(crate) struct TableCore {
    pub(crate) name: String,
    pub(crate) buckets: Box<[Bucket]>,
    pub(crate) key_position: usize,
    pub(crate) config: TableConfig,
    pub(crate) running: AtomicBool,
    pub(crate) gc_signal: GcSignal,
    pub(crate) idle: Idle,
    pub(crate) batch_queue: BatchQueue,
    pub(crate) stats: StatCounters,
    next_ticket: AtomicU64,
}

impl TableCore {
    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    fn bucket_index(&self, key: u64) -> usize {
        (key % self.buckets.len() as u64) as usize
    }

    #[inline]
    fn bucket(&self, key: u64) -> &Bucket {
        &self.buckets[self.bucket_index(key)]
    }

    /// Sums every bucket's garbage counter, reading each under its own lock.
    ///
    /// Not a point-in-time snapshot across buckets.
    pub(crate) fn garbage_size(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.read().garbage).sum()
    }
}

#[derive(Default)]
struct Workers {
    accountant: Option<JoinHandle<()>>,
    collector: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

/// A concurrent key/value table.
///
/// # Example
///
/// ```
/// use gentable::{Table, Value};
///
/// let table = Table::new("users", 1);
///
/// table.insert(7, &Value::tuple(vec![Value::atom("user"), Value::int(0)]));
/// assert_eq!(table.increment(7, &[(2, 5)]).unwrap(), vec![Value::int(5)]);
///
/// let record = table.get(7).unwrap();
/// assert_eq!(record.field(2), Some(&Value::int(5)));
/// ```
pub struct Table {
    core: Arc<TableCore>,
    workers: Mutex<Workers>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.core.name)
            .field("buckets", &self.core.buckets.len())
            .field("key_position", &self.core.key_position)
            .finish()
    }
}

impl Table {
    /// Creates a table with the default configuration and starts its threads.
    pub fn new(name: impl Into<String>, key_position: usize) -> Self {
        let name = name.into();
        Self::start(name, key_position, TableConfig::default())
    }

    /// Creates a table with a custom configuration and starts its threads.
    pub fn with_config(
        name: impl Into<String>,
        key_position: usize,
        config: TableConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::start(name.into(), key_position, config))
    }

    fn start(name: String, key_position: usize, config: TableConfig) -> Self {
        let buckets = (0..config.bucket_count).map(|_| Bucket::new()).collect();
        let core = Arc::new(TableCore {
            name,
            buckets,
            key_position,
            config,
            running: AtomicBool::new(true),
            gc_signal: GcSignal::new(),
            idle: Idle::new(),
            batch_queue: BatchQueue::new(),
            stats: StatCounters::default(),
            next_ticket: AtomicU64::new(1),
        });

        // The collector starts before the accountant that wakes it.
        let collector = spawn_worker("gentable-collector", &core, reclaim::collector_loop);
        let accountant = spawn_worker("gentable-reclaimer", &core, reclaim::accountant_loop);
        let dispatcher = spawn_worker("gentable-batch", &core, batch::dispatcher_loop);
        if dispatcher.is_none() {
            core.batch_queue.close();
        }

        info!(
            table = %core.name,
            buckets = core.buckets.len(),
            key_position,
            "Table created"
        );

        Self {
            core,
            workers: Mutex::new(Workers {
                accountant,
                collector,
                dispatcher,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// The record field treated as the canonical key by the binding layer.
    pub fn key_position(&self) -> usize {
        self.core.key_position
    }

    pub fn bucket_count(&self) -> usize {
        self.core.buckets.len()
    }

    pub fn config(&self) -> &TableConfig {
        &self.core.config
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &TableCore {
        &self.core
    }

    /// Stores a copy of `value` under `key`.
    ///
    /// Returns a copy of the value it replaced, if any. The replaced value is
    /// retired.
    pub fn insert(&self, key: u64, value: &Value) -> Option<Value> {
        self.core.stats.inserts.fetch_add(1, Ordering::Relaxed);

        let mut bucket = self.core.bucket(key).write();
        let old = bucket.put(key, value)?;
        bucket.retire(old);
        Some(bucket.arena.copy_out(old))
    }

    /// Stores a copy of `value` only if `key` is absent.
    ///
    /// Returns `true` if the value was inserted.
    pub fn insert_new(&self, key: u64, value: &Value) -> bool {
        self.core.stats.inserts.fetch_add(1, Ordering::Relaxed);

        let mut bucket = self.core.bucket(key).write();
        if bucket.find(key).is_some() {
            return false;
        }
        bucket.put(key, value);
        true
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: u64) -> Option<Value> {
        self.core.stats.gets.fetch_add(1, Ordering::Relaxed);

        let bucket = self.core.bucket(key).read();
        bucket.find(key).map(|term| bucket.arena.copy_out(term))
    }

    /// Removes `key`, returning a copy of its value. The value is retired.
    pub fn delete(&self, key: u64) -> Option<Value> {
        self.core.stats.deletes.fetch_add(1, Ordering::Relaxed);

        let mut bucket = self.core.bucket(key).write();
        let old = bucket.erase(key)?;
        bucket.retire(old);
        Some(bucket.arena.copy_out(old))
    }

    /// Adds a delta to numeric record fields.
    ///
    /// Each op is `(position, delta)`. Returns the new field values in reverse
    /// op order. Any invalid op aborts the whole call with no change.
    pub fn increment(&self, key: u64, ops: &[(usize, i64)]) -> Result<Vec<Value>> {
        self.update_record(key, |record| record.increment(ops))
    }

    /// Pushes values onto the front of list fields.
    ///
    /// Each op is `(position, values)`; values are pushed one at a time, so
    /// they end up reversed at the head of the list. Returns each list's new
    /// length in reverse op order.
    pub fn unshift(&self, key: u64, ops: &[(usize, Vec<Value>)]) -> Result<Vec<usize>> {
        self.update_record(key, |record| record.unshift(ops))
    }

    /// Pops values off the front of list fields.
    ///
    /// Each op is `(position, count)`. A negative count pops the entire list.
    /// Returns one list of popped values per op, in reverse op order.
    pub fn shift(&self, key: u64, ops: &[(usize, i64)]) -> Result<Vec<Vec<Value>>> {
        self.update_record(key, |record| record.shift(ops))
    }

    /// Replaces record fields, returning the previous values in reverse op order.
    pub fn swap(&self, key: u64, ops: &[(usize, Value)]) -> Result<Vec<Value>> {
        self.update_record(key, |record| record.swap(ops))
    }

    fn update_record<R>(
        &self,
        key: u64,
        apply: impl FnOnce(&mut RecordUpdate<'_>) -> Result<R>,
    ) -> Result<R> {
        self.core.stats.updates.fetch_add(1, Ordering::Relaxed);

        let mut bucket = self.core.bucket(key).write();
        let state = &mut *bucket;

        let stored = state.find(key).ok_or(TableError::KeyNotFound(key))?;
        let fields = state
            .arena
            .tuple_fields(stored)
            .ok_or_else(|| TableError::invalid(format!("value at key {} is not a record", key)))?
            .to_vec();

        let mut record = RecordUpdate::new(&mut state.arena, fields);
        let result = apply(&mut record)?;
        let (fields, retired) = record.finish();

        let committed = state.arena.tuple(fields);
        state.entries.insert(key, committed);
        state.reclaimable.extend(retired);
        Ok(result)
    }

    /// Clears the whole table while holding every bucket's write lock.
    pub fn empty(&self) {
        let mut guards: Vec<_> = self.core.buckets.iter().map(|bucket| bucket.write()).collect();
        for bucket in guards.iter_mut() {
            bucket.reset();
        }
        drop(guards);

        debug!(table = %self.core.name, "Table emptied");
    }

    /// Queues a scan of the whole table; the values are delivered to `caller`.
    ///
    /// Buckets are read one at a time, so the result is a sequence of
    /// per-bucket snapshots rather than one snapshot of the whole table.
    ///
    /// Fails with [`TableError::Stopped`] once the table is shut down or if
    /// its dispatcher never started.
    pub fn dump(&self, caller: &Caller) -> Result<BatchTicket> {
        self.enqueue(BatchKind::Dump, caller)
    }

    /// Queues a scan-and-clear of the whole table; the values are delivered to
    /// `caller`.
    ///
    /// Each bucket is copied out and cleared under its write lock before the
    /// next one is visited.
    pub fn drain(&self, caller: &Caller) -> Result<BatchTicket> {
        self.enqueue(BatchKind::Drain, caller)
    }

    fn enqueue(&self, kind: BatchKind, caller: &Caller) -> Result<BatchTicket> {
        let ticket = BatchTicket::new(self.core.next_ticket.fetch_add(1, Ordering::Relaxed));
        let queued = self.core.batch_queue.push(BatchJob {
            ticket,
            kind,
            reply_to: caller.clone(),
        });
        if !queued {
            return Err(TableError::Stopped(self.core.name.clone()));
        }
        Ok(ticket)
    }

    /// Wakes the collector. Does not wait for the cycle to run.
    pub fn garbage_collect(&self) {
        self.core.gc_signal.request();
    }

    /// Estimated bytes of accounted garbage across all buckets.
    pub fn garbage_size(&self) -> u64 {
        self.core.garbage_size()
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.core.buckets.iter().map(|bucket| bucket.read().entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns table statistics.
    pub fn stats(&self) -> TableStats {
        let stats = &self.core.stats;
        TableStats {
            inserts: stats.inserts.load(Ordering::Relaxed),
            gets: stats.gets.load(Ordering::Relaxed),
            deletes: stats.deletes.load(Ordering::Relaxed),
            updates: stats.updates.load(Ordering::Relaxed),
            collections: stats.collections.load(Ordering::Relaxed),
            batch_jobs: stats.batch_jobs.load(Ordering::Relaxed),
        }
    }

    /// Returns memory usage information (approximate).
    pub fn memory_info(&self) -> MemoryInfo {
        let mut info = MemoryInfo {
            entries: 0,
            arena_nodes: 0,
            arena_bytes: 0,
            pending_reclaim: 0,
        };
        for bucket in self.core.buckets.iter() {
            let bucket = bucket.read();
            info.entries += bucket.entries.len();
            info.arena_nodes += bucket.arena.node_count();
            info.arena_bytes += bucket.arena.allocated_bytes();
            info.pending_reclaim += bucket.reclaimable.len();
        }
        info
    }

    /// Stops the background threads.
    ///
    /// The accountant is joined before the collector it can wake. Jobs still
    /// queued are dropped, and later `dump`/`drain` calls fail with
    /// [`TableError::Stopped`]. Called on drop; calling it twice is harmless.
    pub fn shutdown(&self) {
        let mut workers = self.workers.lock();
        if !self.core.running.swap(false, Ordering::AcqRel) {
            return;
        }

        self.core.idle.wake_all();
        self.core.gc_signal.wake_all();
        let abandoned = self.core.batch_queue.close();
        if abandoned > 0 {
            warn!(table = %self.core.name, abandoned, "Dropping queued batch jobs at shutdown");
        }

        for (name, handle) in [
            ("accountant", workers.accountant.take()),
            ("collector", workers.collector.take()),
            ("dispatcher", workers.dispatcher.take()),
        ] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    error!(table = %self.core.name, worker = name, "Worker thread panicked");
                }
            }
        }

        info!(table = %self.core.name, "Table background threads stopped");
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns a named background thread. On failure the error is logged and the
/// table runs without that service.
fn spawn_worker(
    name: &str,
    core: &Arc<TableCore>,
    body: fn(Arc<TableCore>),
) -> Option<JoinHandle<()>> {
    let core = Arc::clone(core);
    let table = core.name.clone();
    match thread::Builder::new()
        .name(name.to_string())
        .spawn(move || body(core))
    {
        Ok(handle) => Some(handle),
        Err(err) => {
            error!(table = %table, worker = name, error = %err, "Can't create background thread");
            None
        }
    }
}

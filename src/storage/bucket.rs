//! Buckets (Shards)
//!
//! A bucket is one independently locked, independently collected partition of
//! a table. Everything a bucket owns sits behind a single reader/writer lock:
//!
//! ```text
//! ┌──────────────────────── RwLock<BucketState> ────────────────────────┐
//! │  entries: key → Term          arena: Arena (generation g)           │
//! │  reclaimable: [Term, ...]     garbage: estimated bytes accounted    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invariant: every term in `entries` and `reclaimable` was allocated in the
//! *current* `arena`. Retiring a value only moves its term to `reclaimable`;
//! the memory stays in the arena until [`BucketState::compact`] or
//! [`BucketState::reset`] replaces the arena.

use crate::storage::arena::{Arena, Term};
use crate::value::Value;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// The lock-protected contents of a bucket.
#[derive(Debug)]
pub(crate) struct BucketState {
    pub(crate) entries: FxHashMap<u64, Term>,
    pub(crate) arena: Arena,
    pub(crate) reclaimable: VecDeque<Term>,
    pub(crate) garbage: u64,
}

/// What one collection of a bucket did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Compaction {
    pub(crate) live_entries: usize,
    pub(crate) nodes_before: usize,
    pub(crate) nodes_after: usize,
}

impl BucketState {
    fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            arena: Arena::new(0),
            reclaimable: VecDeque::new(),
            garbage: 0,
        }
    }

    pub(crate) fn find(&self, key: u64) -> Option<Term> {
        self.entries.get(&key).copied()
    }

    /// Copies `value` into the arena and stores it, returning the replaced term.
    pub(crate) fn put(&mut self, key: u64, value: &Value) -> Option<Term> {
        let term = self.arena.copy_in(value);
        self.entries.insert(key, term)
    }

    pub(crate) fn erase(&mut self, key: u64) -> Option<Term> {
        self.entries.remove(&key)
    }

    /// Marks a term as no longer live.
    pub(crate) fn retire(&mut self, term: Term) {
        self.reclaimable.push_back(term);
    }

    /// Moves up to `max` retired terms into the garbage estimate.
    ///
    /// Returns how many terms were accounted.
    pub(crate) fn account(&mut self, max: usize) -> usize {
        let mut accounted = 0;
        while accounted < max {
            let Some(term) = self.reclaimable.pop_front() else {
                break;
            };
            self.garbage += self.arena.estimate_size(term);
            accounted += 1;
        }
        accounted
    }

    /// Copies every live entry into a fresh arena and drops the old one,
    /// together with everything retired in it.
    pub(crate) fn compact(&mut self) -> Compaction {
        let nodes_before = self.arena.node_count();
        let mut fresh = Arena::new(self.arena.generation() + 1);
        for term in self.entries.values_mut() {
            *term = fresh.copy_from(&self.arena, *term);
        }
        let old = std::mem::replace(&mut self.arena, fresh);
        self.reclaimable.clear();
        self.garbage = 0;
        drop(old);

        Compaction {
            live_entries: self.entries.len(),
            nodes_before,
            nodes_after: self.arena.node_count(),
        }
    }

    /// Drops every entry and installs a fresh arena.
    pub(crate) fn reset(&mut self) {
        self.entries.clear();
        self.arena = Arena::new(self.arena.generation() + 1);
        self.reclaimable.clear();
        self.garbage = 0;
    }

    /// Copies every live value out, appending to `out`.
    pub(crate) fn snapshot_into(&self, out: &mut Vec<Value>) {
        out.extend(self.entries.values().map(|term| self.arena.copy_out(*term)));
    }

    /// Copies every live value out, then resets the bucket.
    pub(crate) fn drain_into(&mut self, out: &mut Vec<Value>) {
        self.snapshot_into(out);
        self.reset();
    }
}

/// One shard of a table.
#[derive(Debug)]
pub(crate) struct Bucket {
    state: RwLock<BucketState>,
}

impl Bucket {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(BucketState::new()),
        }
    }

    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BucketState> {
        self.state.read()
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BucketState> {
        self.state.write()
    }
}

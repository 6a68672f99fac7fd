//! Storage Module
//!
//! Everything a table keeps in memory: the per-bucket [`Arena`] values live
//! in, the bucket that pairs an arena with its entry map and
//! reclamation list, and the [`Table`] that routes keys to buckets.
//!
//! ```text
//! ┌──────────────────────── Table ────────────────────────┐
//! │  key % N                                              │
//! │    │                                                  │
//! │    ▼                                                  │
//! │  ┌───────────────── Bucket (RwLock) ────────────────┐ │
//! │  │ entries: key -> Term      reclaimable: [Term]    │ │
//! │  │ arena:   generation g     garbage: bytes         │ │
//! │  └──────────────────────────────────────────────────┘ │
//! └───────────────────────────────────────────────────────┘
//! ```

pub mod arena;
pub(crate) mod bucket;
pub(crate) mod record;
pub mod table;

pub use arena::{Arena, Term};
pub use table::{MemoryInfo, Table, TableStats};

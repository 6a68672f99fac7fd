//! # gentable - A Concurrent Sharded Table Engine
//!
//! gentable is an in-memory key/value table for structured values, built for
//! many threads reading and writing at once. Each table is split into buckets
//! that own their values in a private arena; replaced values are reclaimed in
//! the background by a copying collector instead of being freed on the write
//! path.
//!
//! ## Features
//!
//! - **Sharded Locking**: Integer keys route to one of N buckets, each behind
//!   its own `RwLock`
//! - **Record Updates**: Atomic positional updates (increment, push, pop,
//!   replace) on tuple fields
//! - **Background Reclamation**: An accountant thread estimates garbage and a
//!   collector thread compacts buckets one at a time
//! - **Batch Scans**: `dump` and `drain` run on a dedicated worker and reply
//!   asynchronously
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               Registry                                  │
//! │                      name ──> Arc<Table>                                │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │  ┌───────────────────────────── Table ──────────────────────────────┐  │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐                    │  │
//! │  │  │Bucket 0│ │Bucket 1│ │Bucket 2│ │...N    │  insert / get /    │  │
//! │  │  │RwLock  │ │RwLock  │ │RwLock  │ │buckets │  delete / update   │  │
//! │  │  │Arena   │ │Arena   │ │Arena   │ │        │                    │  │
//! │  │  └────────┘ └────────┘ └────────┘ └────────┘                    │  │
//! │  │       ▲                     ▲                  ▲                 │  │
//! │  │       │                     │                  │                 │  │
//! │  │  ┌────┴───────┐      ┌──────┴─────┐     ┌──────┴──────┐          │  │
//! │  │  │ Accountant │─────>│ Collector  │     │ Dispatcher  │<── jobs  │  │
//! │  │  │  (thread)  │signal│  (thread)  │     │  (thread)   │──> Inbox │  │
//! │  │  └────────────┘      └────────────┘     └─────────────┘          │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use gentable::{mailbox, registry, Value};
//!
//! let sessions = registry::global().create("sessions", 1).unwrap();
//!
//! sessions.insert(
//!     42,
//!     &Value::tuple(vec![Value::int(42), Value::int(0), Value::list(vec![])]),
//! );
//! sessions.increment(42, &[(2, 1)]).unwrap();
//! sessions.unshift(42, &[(3, vec![Value::atom("login")])]).unwrap();
//!
//! let (caller, mut inbox) = mailbox();
//! sessions.dump(&caller).unwrap();
//! let response = inbox.blocking_recv().unwrap();
//! assert_eq!(response.values.len(), 1);
//!
//! registry::global().remove("sessions").unwrap();
//! ```
//!
//! ## Module Overview
//!
//! - [`value`]: Host-side value model
//! - [`storage`]: Arenas, buckets and the sharded [`Table`]
//! - [`batch`]: Queued whole-table jobs and their reply transport
//! - [`registry`]: Named tables
//! - [`config`]: Table tuning knobs
//! - [`error`]: Error types
//!
//! ## Design Highlights
//!
//! ### Generational Arenas
//!
//! A bucket never frees a single value. Writes allocate into the bucket's
//! arena and retire what they replace; a collection cycle copies the live
//! entries into a new arena and drops the old one whole.
//!
//! ### One Lock at a Time
//!
//! Point operations, the collector and the batch dispatcher each hold at most
//! one bucket lock. Only `empty` holds them all, and it acquires them in index
//! order.

pub mod batch;
pub mod config;
pub mod error;
mod reclaim;
pub mod registry;
pub mod storage;
pub mod value;

// Re-export commonly used types for convenience
pub use batch::{mailbox, BatchKind, BatchResponse, BatchTicket, Caller, Inbox};
pub use config::TableConfig;
pub use error::{Result, TableError};
pub use registry::Registry;
pub use storage::{MemoryInfo, Table, TableStats};
pub use value::Value;

/// Version of gentable
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

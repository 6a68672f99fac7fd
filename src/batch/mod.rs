//! Batch Dispatcher
//!
//! Whole-table scans are too expensive to run under one giant lock and too
//! rare to deserve more than one worker. `dump` and `drain` therefore only
//! enqueue a job and return a [`BatchTicket`]; a single dispatcher
//! thread pops jobs in FIFO order, walks the buckets one at a time, and sends
//! the collected values to the caller's [`Inbox`].
//!
//! ```text
//!   dump(&caller) ──┐
//!   drain(&caller) ─┼─> Mutex<VecDeque<BatchJob>> ──> dispatcher thread
//!   dump(&caller) ──┘          + Condvar                   │
//!                                                          │ bucket 0..N, one lock at a time
//!                                                          ▼
//!                                        caller.deliver(BatchResponse) ──> Inbox
//! ```
//!
//! The queue lock is never held while a bucket lock is taken.
//!
//! ## Example
//!
//! ```
//! use gentable::{mailbox, Table, Value};
//!
//! let table = Table::new("events", 1);
//! table.insert(1, &Value::int(10));
//!
//! let (caller, mut inbox) = mailbox();
//! let ticket = table.dump(&caller).unwrap();
//!
//! let response = inbox.blocking_recv().unwrap();
//! assert_eq!(response.ticket, ticket);
//! assert_eq!(response.values, vec![Value::int(10)]);
//! ```

mod dispatcher;

pub use dispatcher::{mailbox, BatchKind, BatchResponse, BatchTicket, Caller, Inbox};
pub(crate) use dispatcher::{dispatcher_loop, BatchJob, BatchQueue};

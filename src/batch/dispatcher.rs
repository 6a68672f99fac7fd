use crate::storage::table::TableCore;
use crate::value::Value;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Identifies one queued whole-table job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchTicket(u64);

impl BatchTicket {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

/// Which whole-table handler a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Copy every value out, bucket by bucket, under read locks
    Dump,
    /// Copy every value out and clear each bucket under its write lock
    Drain,
}

/// The asynchronous reply to a `dump` or `drain`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    /// The ticket returned when the job was queued
    pub ticket: BatchTicket,
    /// Which handler produced the values
    pub kind: BatchKind,
    /// Every value seen, bucket 0 first
    pub values: Vec<Value>,
}

/// Where batch responses are delivered. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Caller {
    tx: mpsc::UnboundedSender<BatchResponse>,
}

impl Caller {
    /// Sends a response, returning `false` if the inbox is gone.
    pub(crate) fn deliver(&self, response: BatchResponse) -> bool {
        self.tx.send(response).is_ok()
    }
}

/// Receives batch responses addressed to a [`Caller`].
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<BatchResponse>,
}

impl Inbox {
    /// Waits for the next response. Returns `None` once every `Caller` is
    /// dropped and no responses remain.
    pub async fn recv(&mut self) -> Option<BatchResponse> {
        self.rx.recv().await
    }

    /// Blocking variant of [`Inbox::recv`] for use outside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<BatchResponse> {
        self.rx.blocking_recv()
    }

    /// Returns a response if one has already arrived.
    pub fn try_recv(&mut self) -> Option<BatchResponse> {
        self.rx.try_recv().ok()
    }
}

/// Creates a caller identity and the inbox its responses arrive in.
pub fn mailbox() -> (Caller, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Caller { tx }, Inbox { rx })
}

/// A queued whole-table operation.
#[derive(Debug)]
pub(crate) struct BatchJob {
    pub(crate) ticket: BatchTicket,
    pub(crate) kind: BatchKind,
    pub(crate) reply_to: Caller,
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<BatchJob>,
    closed: bool,
}

/// FIFO of pending jobs, guarded by one mutex/condvar pair.
///
/// Once closed the queue refuses new jobs, so nothing can be left waiting
/// for a dispatcher that is gone.
#[derive(Debug, Default)]
pub(crate) struct BatchQueue {
    state: Mutex<QueueState>,
    cond: Condvar,
}

impl BatchQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a job. Returns `false` without queuing if the queue is closed.
    pub(crate) fn push(&self, job: BatchJob) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.jobs.push_back(job);
        self.cond.notify_one();
        true
    }

    /// Blocks until a job is available. Returns `None` once the queue is closed.
    fn next_job(&self) -> Option<BatchJob> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            self.cond.wait(&mut state);
        }
    }

    /// Refuses further jobs, drops the queued ones and wakes the dispatcher.
    /// Returns how many jobs were dropped.
    pub(crate) fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let abandoned = state.jobs.len();
        state.jobs.clear();
        self.cond.notify_all();
        abandoned
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }
}

/// Copies every value out, one bucket read lock at a time.
fn dump_buckets(core: &TableCore) -> Vec<Value> {
    let mut values = Vec::new();
    for bucket in core.buckets.iter() {
        bucket.read().snapshot_into(&mut values);
    }
    values
}

/// Copies every value out and clears each bucket, one write lock at a time.
fn drain_buckets(core: &TableCore) -> Vec<Value> {
    let mut values = Vec::new();
    for bucket in core.buckets.iter() {
        bucket.write().drain_into(&mut values);
    }
    values
}

/// The dispatcher thread body.
pub(crate) fn dispatcher_loop(core: Arc<TableCore>) {
    debug!(table = %core.name, "Batch dispatcher started");

    while let Some(job) = core.batch_queue.next_job() {
        let values = match job.kind {
            BatchKind::Dump => dump_buckets(&core),
            BatchKind::Drain => drain_buckets(&core),
        };
        core.stats.batch_jobs.fetch_add(1, Ordering::Relaxed);

        debug!(
            table = %core.name,
            ticket = %job.ticket,
            kind = ?job.kind,
            values = values.len(),
            "Batch job complete"
        );

        let delivered = job.reply_to.deliver(BatchResponse {
            ticket: job.ticket,
            kind: job.kind,
            values,
        });
        if !delivered {
            debug!(table = %core.name, ticket = %job.ticket, "Caller went away before reply");
        }
    }

    debug!(table = %core.name, "Batch dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;
    use crate::storage::table::Table;
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    fn ints(values: &[Value]) -> HashSet<i64> {
        values.iter().filter_map(Value::as_int).collect()
    }

    async fn recv(inbox: &mut Inbox) -> BatchResponse {
        tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_dump_does_not_mutate() {
        let table = Table::new("batch", 1);
        for key in 0..100u64 {
            table.insert(key, &Value::int(key as i64));
            table.insert(key, &Value::int(key as i64 * 2));
        }

        // Let the accountant finish so the garbage estimate stops moving.
        let deadline = Instant::now() + Duration::from_secs(5);
        while table.memory_info().pending_reclaim > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let garbage_before = table.garbage_size();
        let info_before = table.memory_info();
        assert_eq!(info_before.pending_reclaim, 0);
        assert_eq!(garbage_before, 100 * 8);

        let (caller, mut inbox) = mailbox();
        table.dump(&caller).unwrap();
        let response = recv(&mut inbox).await;

        assert_eq!(response.kind, BatchKind::Dump);
        assert_eq!(ints(&response.values), (0..100).map(|n| n * 2).collect());
        assert_eq!(table.garbage_size(), garbage_before);
        assert_eq!(table.memory_info(), info_before);
        for key in 0..100u64 {
            assert_eq!(table.get(key), Some(Value::int(key as i64 * 2)));
        }
    }

    #[tokio::test]
    async fn test_drain_empties_table() {
        let table = Table::new("batch", 1);
        for key in 0..50u64 {
            table.insert(key, &Value::tuple(vec![Value::int(key as i64)]));
        }

        let (caller, mut inbox) = mailbox();
        table.drain(&caller).unwrap();
        let response = recv(&mut inbox).await;

        assert_eq!(response.kind, BatchKind::Drain);
        assert_eq!(response.values.len(), 50);
        for key in 0..50u64 {
            assert_eq!(table.get(key), None);
        }
        assert_eq!(table.garbage_size(), 0);
        assert_eq!(table.memory_info().arena_nodes, 0);
    }

    #[tokio::test]
    async fn test_responses_arrive_in_submission_order() {
        let table = Table::new("batch", 1);
        table.insert(1, &Value::int(1));

        let (caller, mut inbox) = mailbox();
        let tickets: Vec<_> = (0..10)
            .map(|i| {
                if i == 5 {
                    table.drain(&caller).unwrap()
                } else {
                    table.dump(&caller).unwrap()
                }
            })
            .collect();

        for (i, ticket) in tickets.iter().enumerate() {
            let response = recv(&mut inbox).await;
            assert_eq!(response.ticket, *ticket);
            // Jobs after the drain see an empty table.
            let expected = if i <= 5 { 1 } else { 0 };
            assert_eq!(response.values.len(), expected);
        }
    }

    #[tokio::test]
    async fn test_replies_go_to_their_own_caller() {
        let table = Table::new("batch", 1);
        table.insert(1, &Value::int(1));

        let (first, mut first_inbox) = mailbox();
        let (second, mut second_inbox) = mailbox();
        let first_ticket = table.dump(&first).unwrap();
        let second_ticket = table.dump(&second).unwrap();

        let a = recv(&mut first_inbox).await;
        let b = recv(&mut second_inbox).await;
        assert_eq!(a.ticket, first_ticket);
        assert_eq!(b.ticket, second_ticket);
        assert!(first_inbox.try_recv().is_none());
    }

    #[test]
    fn test_dropped_inbox_does_not_stall_dispatcher() {
        let table = Table::new("batch", 1);
        table.insert(1, &Value::int(1));

        let (gone, inbox) = mailbox();
        drop(inbox);
        table.dump(&gone).unwrap();

        let (caller, mut inbox) = mailbox();
        table.dump(&caller).unwrap();
        let response = tokio_test::block_on(inbox.recv()).unwrap();
        assert_eq!(response.values, vec![Value::int(1)]);
    }

    #[test]
    fn test_batch_after_shutdown_is_refused() {
        let table = Table::new("batch", 1);
        table.insert(1, &Value::int(1));
        table.shutdown();

        let (caller, mut inbox) = mailbox();
        assert_eq!(
            table.dump(&caller),
            Err(TableError::Stopped("batch".to_string()))
        );
        assert_eq!(
            table.drain(&caller),
            Err(TableError::Stopped("batch".to_string()))
        );
        assert!(inbox.try_recv().is_none());

        // Nothing was queued, and the table itself is untouched.
        drop(caller);
        assert!(inbox.blocking_recv().is_none());
        assert_eq!(table.get(1), Some(Value::int(1)));
    }

    #[test]
    fn test_closed_queue_refuses_jobs() {
        let queue = BatchQueue::new();
        let (caller, _inbox) = mailbox();
        let job = |id| BatchJob {
            ticket: BatchTicket::new(id),
            kind: BatchKind::Dump,
            reply_to: caller.clone(),
        };

        assert!(queue.push(job(1)));
        assert!(queue.push(job(2)));
        assert_eq!(queue.close(), 2);
        assert_eq!(queue.len(), 0);

        assert!(!queue.push(job(3)));
        assert_eq!(queue.len(), 0);
        assert!(queue.next_job().is_none());
    }

    #[test]
    fn test_ticket_display() {
        assert_eq!(BatchTicket::new(7).to_string(), "batch#7");
        assert_eq!(BatchTicket::new(7).id(), 7);
    }
}

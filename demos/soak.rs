//! gentable soak run
//!
//! Hammers one table from several threads with inserts, positional updates
//! and deletes while the background collector runs, then checks every
//! counter against what the workers report and drains the table.
//!
//! ```text
//! cargo run --release --example soak -- [THREADS] [OPS_PER_THREAD]
//! ```

use anyhow::{bail, Context};
use gentable::{mailbox, registry, TableConfig, Value};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const KEYS_PER_THREAD: u64 = 1_000;

fn parse_arg(args: &[String], index: usize, default: u64) -> anyhow::Result<u64> {
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid numeric argument: {}", raw)),
        None => Ok(default),
    }
}

fn counter_record(key: u64) -> Value {
    Value::tuple(vec![
        Value::int(key as i64),
        Value::int(0),
        Value::list(vec![]),
    ])
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let threads = parse_arg(&args, 1, 4)?;
    let ops = parse_arg(&args, 2, 50_000)?;

    // Set up logging
    FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .with_thread_names(true)
        .init();

    let config = TableConfig {
        reclaim_threshold: 256 * 1024,
        reclaim_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let table = registry::global().create_with_config("soak", 1, config)?;
    info!(threads, ops, "Starting soak run");

    let started = Instant::now();
    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::Builder::new()
                .name(format!("soak-{}", t))
                .spawn(move || -> gentable::Result<u64> {
                    let base = t * KEYS_PER_THREAD;
                    for key in base..base + KEYS_PER_THREAD {
                        table.insert(key, &counter_record(key));
                    }

                    let mut increments = 0;
                    for i in 0..ops {
                        let key = base + i % KEYS_PER_THREAD;
                        match i % 4 {
                            0 | 1 => {
                                table.increment(key, &[(2, 1)])?;
                                increments += 1;
                            }
                            2 => {
                                table.unshift(key, &[(3, vec![Value::int(i as i64)])])?;
                                table.shift(key, &[(3, 1)])?;
                            }
                            _ => {
                                table.swap(key, &[(3, Value::list(vec![]))])?;
                            }
                        }
                    }
                    Ok(increments)
                })
                .context("spawning soak worker")
        })
        .collect::<anyhow::Result<_>>()?;

    let mut expected = 0i64;
    for worker in workers {
        match worker.join() {
            Ok(result) => expected += result? as i64,
            Err(_) => bail!("soak worker panicked"),
        }
    }
    let elapsed = started.elapsed();

    let mut total = 0i64;
    for key in 0..threads * KEYS_PER_THREAD {
        let record = table.get(key).context("record vanished")?;
        total += record.field(2).and_then(Value::as_int).unwrap_or(0);
        // Every unshift is undone by a shift and every swap empties the list.
        let pending = record.field(3).and_then(Value::as_list).map_or(0, <[Value]>::len);
        if pending != 0 {
            bail!("key {} left {} queued entries", key, pending);
        }
    }
    if total != expected {
        bail!("counter mismatch: expected {}, found {}", expected, total);
    }

    table.garbage_collect();
    thread::sleep(Duration::from_millis(100));

    let stats = table.stats();
    let memory = table.memory_info();
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        updates = stats.updates,
        collections = stats.collections,
        arena_nodes = memory.arena_nodes,
        pending = memory.pending_reclaim,
        garbage = table.garbage_size(),
        "Workload finished"
    );

    let (caller, mut inbox) = mailbox();
    table.drain(&caller)?;
    let drained = inbox.blocking_recv().context("dispatcher stopped")?;
    info!(values = drained.values.len(), "Table drained");

    registry::global().remove("soak")?;
    Ok(())
}

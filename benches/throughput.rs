//! Throughput Benchmark for gentable
//!
//! This benchmark measures point and positional operations on a table
//! under various workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use gentable::{Table, Value};
use std::sync::Arc;
use std::time::Duration;

fn record(key: u64) -> Value {
    Value::tuple(vec![
        Value::int(key as i64),
        Value::int(0),
        Value::list(vec![]),
    ])
}

/// Benchmark Insert operations
fn bench_insert(c: &mut Criterion) {
    let table = Table::new("bench", 1);

    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert_int", |b| {
        let mut i = 0u64;
        b.iter(|| {
            table.insert(i, &Value::int(i as i64));
            i += 1;
        });
    });

    group.bench_function("insert_record", |b| {
        let mut i = 0u64;
        b.iter(|| {
            table.insert(i % 100_000, &record(i));
            i += 1;
        });
    });

    group.bench_function("insert_binary_1k", |b| {
        let mut i = 0u64;
        let payload = Value::binary("x".repeat(1024));
        b.iter(|| {
            table.insert(i % 10_000, &payload);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark Get operations
fn bench_get(c: &mut Criterion) {
    let table = Table::new("bench", 1);

    // Pre-populate with data
    for i in 0..100_000 {
        table.insert(i, &record(i));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(table.get(i % 100_000));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 100_000u64;
        b.iter(|| {
            black_box(table.get(i));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark Increment operations
fn bench_increment(c: &mut Criterion) {
    let table = Table::new("bench", 1);
    for i in 0..1_000 {
        table.insert(i, &record(i));
    }

    let mut group = c.benchmark_group("increment");
    group.throughput(Throughput::Elements(1));

    // Single record (high contention on one bucket)
    group.bench_function("single_record", |b| {
        b.iter(|| {
            black_box(table.increment(0, &[(2, 1)]).unwrap());
        });
    });

    group.bench_function("many_records", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(table.increment(i % 1_000, &[(2, 1)]).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let table = Arc::new(Table::new("bench", 1));
            let handles: Vec<_> = (0..4u64)
                .map(|t| {
                    let table = Arc::clone(&table);
                    thread::spawn(move || {
                        for i in 0..10_000u64 {
                            let key = t * 100_000 + i % 1_000;
                            if i % 5 == 0 {
                                table.insert(key, &record(key));
                            } else {
                                black_box(table.get(key));
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(table.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_get,
    bench_increment,
    bench_concurrent,
);

criterion_main!(benches);

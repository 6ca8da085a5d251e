//! Lock acquisition benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use objlock_bench::{
    generate_keys, populate_readers, populate_writers, shuffled_targets, LOCKING_LEVELS,
};
use objlock_core::{IsolationLevel, LockConfig, LockManager, LockTarget, TransactionId};

/// Benchmark an uncontended write lock plus release per level.
fn bench_write_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_release");

    for level in IsolationLevel::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, &level| {
            let manager = LockManager::new(LockConfig::default()).unwrap();
            let target = LockTarget::new("Bench:0", level);
            let tx = TransactionId::new("T1");

            b.iter(|| {
                black_box(manager.write_lock(&tx, &target).unwrap());
                black_box(manager.release_lock(&tx, &target).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark read, upgrade and release per locking level.
fn bench_read_upgrade_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_upgrade_release");

    for level in LOCKING_LEVELS {
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, &level| {
            let manager = LockManager::new(LockConfig::default()).unwrap();
            let target = LockTarget::new("Bench:0", level);
            let tx = TransactionId::new("T1");

            b.iter(|| {
                manager.read_lock(&tx, &target).unwrap();
                black_box(manager.upgrade_lock(&tx, &target).unwrap());
                manager.release_lock(&tx, &target).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark a batch of write locks across many keys, released at once.
fn bench_batch_locks(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_locks");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let manager = LockManager::new(LockConfig::default()).unwrap();
                let targets = shuffled_targets(batch_size, IsolationLevel::Repeatable);
                let tx = TransactionId::new("T1");

                b.iter(|| {
                    for target in &targets {
                        manager.write_lock(&tx, target).unwrap();
                    }
                    black_box(manager.release_all(&tx, &targets).unwrap());
                });
            },
        );
    }
    group.finish();
}

/// Benchmark refused writes against a populated table.
fn bench_conflict(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict");

    for table_size in [100, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(table_size),
            table_size,
            |b, &table_size| {
                let manager = LockManager::new(LockConfig::default()).unwrap();
                let keys = generate_keys(table_size);
                populate_writers(&manager, &keys);
                let target =
                    LockTarget::new(keys[table_size / 2].clone(), IsolationLevel::Repeatable);
                let tx = TransactionId::new("Intruder");

                b.iter(|| black_box(manager.write_lock(&tx, &target).unwrap()));
            },
        );
    }
    group.finish();
}

/// Benchmark read checks with many readers on one object.
fn bench_check_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_read");

    for readers in [1, 16, 256].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(readers), readers, |b, &readers| {
            let manager = LockManager::new(LockConfig::default()).unwrap();
            let key = generate_keys(1).remove(0);
            populate_readers(&manager, &key, readers);
            let target = LockTarget::new(key, IsolationLevel::Committed);
            let tx = TransactionId::new("Reader0");

            b.iter(|| black_box(manager.check_read(&tx, &target).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_write_release,
    bench_read_upgrade_release,
    bench_batch_locks,
    bench_conflict,
    bench_check_read,
);

criterion_main!(benches);

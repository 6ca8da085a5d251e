//! Stress tests for the lock manager.
//!
//! Worker threads hammer a small set of keys with read, write and upgrade
//! requests. Every granted lock is mirrored in per-key occupancy counters
//! that are independent of the lock table; a grant that finds the counters
//! in a state its isolation level forbids is counted as a violation.

use crate::invariants::check_table;
use objlock_core::{IsolationLevel, LockManager, LockTarget, ObjectKey, TransactionId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Acquisitions that were granted.
    pub granted_ops: usize,
    /// Acquisitions that were refused.
    pub refused_ops: usize,
    /// Operations that returned an error, including panicked workers.
    pub error_ops: usize,
    /// Grants that overlapped a conflicting holder.
    pub violations: usize,
    /// Table invariant violations found after the run.
    pub table_violations: usize,
    /// Slots still in the table after the run.
    pub remaining_slots: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    fn new(tally: Tally, duration: Duration) -> Self {
        let total = tally.granted + tally.refused + tally.errors;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            granted_ops: tally.granted,
            refused_ops: tally.refused,
            error_ops: tally.errors,
            violations: tally.violations,
            table_violations: 0,
            remaining_slots: 0,
            duration,
            ops_per_second,
        }
    }

    /// Returns true if the run saw no violation, no error and left the
    /// table empty.
    pub fn is_clean(&self) -> bool {
        self.violations == 0
            && self.table_violations == 0
            && self.error_ops == 0
            && self.remaining_slots == 0
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Granted: {}", self.granted_ops);
        println!("Refused: {}", self.refused_ops);
        println!("Errors: {}", self.error_ops);
        println!("Exclusion violations: {}", self.violations);
        println!("Table violations: {}", self.table_violations);
        println!("Remaining slots: {}", self.remaining_slots);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform, split across threads.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of distinct keys.
    pub keys: usize,
    /// Isolation level of every target.
    pub level: IsolationLevel,
    /// Share of operations that start with a read lock.
    pub read_ratio: f64,
    /// Share of granted reads that are then upgraded.
    pub upgrade_ratio: f64,
    /// Spins while a lock is held.
    pub hold_spins: u32,
    /// Base seed for the per-thread random generators.
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            keys: 8,
            level: IsolationLevel::Repeatable,
            read_ratio: 0.5,
            upgrade_ratio: 0.2,
            hold_spins: 32,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    granted: usize,
    refused: usize,
    errors: usize,
    violations: usize,
}

impl Tally {
    fn merge(&mut self, other: Tally) {
        self.granted += other.granted;
        self.refused += other.refused;
        self.errors += other.errors;
        self.violations += other.violations;
    }

    fn record(&mut self, outcome: objlock_core::LockResult<bool>) -> bool {
        match outcome {
            Ok(true) => {
                self.granted += 1;
                true
            }
            Ok(false) => {
                self.refused += 1;
                false
            }
            Err(_) => {
                self.errors += 1;
                false
            }
        }
    }
}

/// Holders of one key as seen by the workers themselves.
#[derive(Debug, Default)]
struct Occupancy {
    readers: AtomicUsize,
    writers: AtomicUsize,
}

impl Occupancy {
    /// Registers a writer; true if the grant conflicts with current holders.
    /// `extra_readers` counts reader registrations the caller itself still
    /// holds.
    fn enter_writer(&self, level: IsolationLevel, extra_readers: usize) -> bool {
        let writers = self.writers.fetch_add(1, Ordering::SeqCst) + 1;
        let readers = self.readers.load(Ordering::SeqCst);
        writers > 1 || (writers_exclude_readers(level) && readers > extra_readers)
    }

    fn leave_writer(&self) {
        self.writers.fetch_sub(1, Ordering::SeqCst);
    }

    /// Registers a reader; true if the grant conflicts with current holders.
    ///
    /// Read-committed writers may legally arrive while a reader is held, so
    /// only the levels where readers keep writers out are checked.
    fn enter_reader(&self, level: IsolationLevel) -> bool {
        let readers = self.readers.fetch_add(1, Ordering::SeqCst) + 1;
        let writers = self.writers.load(Ordering::SeqCst);
        match level {
            IsolationLevel::Repeatable => writers > 0,
            IsolationLevel::Serializable => writers > 0 || readers > 1,
            _ => false,
        }
    }

    fn leave_reader(&self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }
}

fn writers_exclude_readers(level: IsolationLevel) -> bool {
    matches!(
        level,
        IsolationLevel::Repeatable | IsolationLevel::Serializable
    )
}

fn hold(spins: u32) {
    for _ in 0..spins {
        std::hint::spin_loop();
    }
}

/// Runs a contended read/write/upgrade workload against `manager`.
///
/// Every operation uses a fresh transaction and releases what it acquired,
/// so a clean run leaves the table empty. No-lock levels grant everything
/// without exclusion, so occupancy checks are skipped for them.
pub fn stress_contention(manager: Arc<LockManager>, config: &StressConfig) -> StressTestResult {
    let keys: Arc<Vec<ObjectKey>> = Arc::new(
        (0..config.keys.max(1))
            .map(|i| ObjectKey::new(format!("Stress:{i}")))
            .collect(),
    );
    let occupancy: Arc<Vec<Occupancy>> =
        Arc::new(keys.iter().map(|_| Occupancy::default()).collect());
    let threads = config.threads.max(1);
    let ops_per_thread = config.operations / threads;
    let checked = config.level.uses_lock_table();

    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let manager = Arc::clone(&manager);
            let keys = Arc::clone(&keys);
            let occupancy = Arc::clone(&occupancy);
            let config = config.clone();

            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let mut tally = Tally::default();

                for i in 0..ops_per_thread {
                    let index = rng.gen_range(0..keys.len());
                    let target = LockTarget::new(keys[index].clone(), config.level);
                    let slot = &occupancy[index];
                    let tx = TransactionId::new(format!("W{t}-{i}"));

                    if rng.gen_bool(config.read_ratio.clamp(0.0, 1.0)) {
                        if !tally.record(manager.read_lock(&tx, &target)) {
                            continue;
                        }
                        if checked && slot.enter_reader(config.level) {
                            tally.violations += 1;
                        }
                        hold(config.hold_spins);

                        if rng.gen_bool(config.upgrade_ratio.clamp(0.0, 1.0))
                            && tally.record(manager.upgrade_lock(&tx, &target))
                        {
                            if checked && slot.enter_writer(config.level, 1) {
                                tally.violations += 1;
                            }
                            if checked {
                                slot.leave_reader();
                            }
                            hold(config.hold_spins);
                            if checked {
                                slot.leave_writer();
                            }
                        } else if checked {
                            slot.leave_reader();
                        }
                    } else {
                        if !tally.record(manager.write_lock(&tx, &target)) {
                            continue;
                        }
                        if checked && slot.enter_writer(config.level, 0) {
                            tally.violations += 1;
                        }
                        hold(config.hold_spins);
                        if checked {
                            slot.leave_writer();
                        }
                    }

                    if manager.release_lock(&tx, &target).is_err() {
                        tally.errors += 1;
                    }
                }

                tally
            })
        })
        .collect();

    let mut tally = Tally::default();
    for handle in handles {
        match handle.join() {
            Ok(worker) => tally.merge(worker),
            Err(_) => tally.errors += 1,
        }
    }

    let mut result = StressTestResult::new(tally, start.elapsed());
    result.table_violations = check_table(manager.table(), config.level).len();
    result.remaining_slots = manager.table().len();
    result
}

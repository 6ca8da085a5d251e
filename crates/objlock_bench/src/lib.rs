//! Benchmark utilities.

use objlock_core::{
    IsolationLevel, LockConfig, LockManager, LockTarget, ManualClock, ObjectKey, TransactionId,
};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Levels that keep entries in the lock table.
pub const LOCKING_LEVELS: [IsolationLevel; 4] = [
    IsolationLevel::Uncommitted,
    IsolationLevel::Committed,
    IsolationLevel::Repeatable,
    IsolationLevel::Serializable,
];

/// Generate `count` distinct object keys.
pub fn generate_keys(count: usize) -> Vec<ObjectKey> {
    (0..count)
        .map(|i| ObjectKey::new(format!("Bench:{i}")))
        .collect()
}

/// Generate `count` targets at `level` in random order.
pub fn shuffled_targets(count: usize, level: IsolationLevel) -> Vec<LockTarget> {
    let mut targets: Vec<_> = generate_keys(count)
        .into_iter()
        .map(|key| LockTarget::new(key, level))
        .collect();
    targets.shuffle(&mut rand::thread_rng());
    targets
}

/// Creates a manager on a manual clock.
pub fn manual_manager(config: LockConfig) -> (LockManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let manager = LockManager::with_clock(config, clock.clone()).expect("Invalid bench config");
    (manager, clock)
}

/// Fills the table with one writer per key, each owned by its own
/// transaction.
pub fn populate_writers(manager: &LockManager, keys: &[ObjectKey]) {
    for (i, key) in keys.iter().enumerate() {
        let target = LockTarget::new(key.clone(), IsolationLevel::Repeatable);
        let tx = TransactionId::new(format!("Holder{i}"));
        manager.write_lock(&tx, &target).expect("Populate failed");
    }
}

/// Adds `readers` read-committed readers to `key`.
pub fn populate_readers(manager: &LockManager, key: &ObjectKey, readers: usize) {
    let target = LockTarget::new(key.clone(), IsolationLevel::Committed);
    for i in 0..readers {
        let tx = TransactionId::new(format!("Reader{i}"));
        manager.read_lock(&tx, &target).expect("Populate failed");
    }
}

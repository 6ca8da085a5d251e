//! Concurrent access to the same objects.

use objlock_core::{IsolationLevel, LockConfig, LockManager, LockTarget, TransactionId};
use objlock_testkit::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

/// Starts `threads` transactions at once, each calling `op` on the same
/// target, and returns how many were granted.
fn race<F>(level: IsolationLevel, threads: usize, op: F) -> (usize, Arc<LockManager>)
where
    F: Fn(&LockManager, &TransactionId, &LockTarget) -> bool + Send + Sync + 'static,
{
    let manager = Arc::new(LockManager::new(LockConfig::default()).unwrap());
    let granted = race_on(Arc::clone(&manager), level, threads, op);
    (granted, manager)
}

/// Like [`race`], but on an existing manager.
fn race_on<F>(manager: Arc<LockManager>, level: IsolationLevel, threads: usize, op: F) -> usize
where
    F: Fn(&LockManager, &TransactionId, &LockTarget) -> bool + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let op = Arc::new(op);

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            let op = Arc::clone(&op);
            thread::spawn(move || {
                let target = LockTarget::new("Hot:1", level);
                let tx = TransactionId::new(format!("T{i}"));
                barrier.wait();
                (*op)(&*manager, &tx, &target)
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .filter(|granted| *granted)
        .count()
}

#[test]
fn exactly_one_writer_wins() {
    for level in [
        IsolationLevel::Uncommitted,
        IsolationLevel::Committed,
        IsolationLevel::Repeatable,
        IsolationLevel::Serializable,
    ] {
        let (granted, manager) = race(level, 8, |m, tx, t| m.write_lock(tx, t).unwrap());
        assert_eq!(granted, 1, "{level}");
        assert_eq!(manager.stats().snapshot().grants, 1, "{level}");
    }
}

#[test]
fn exactly_one_serializable_reader_wins() {
    let (granted, manager) = race(IsolationLevel::Serializable, 8, |m, tx, t| {
        m.read_lock(tx, t).unwrap()
    });
    assert_eq!(granted, 1);
    assert_eq!(manager.table().reader_count(&"Hot:1".into()), 1);
}

#[test]
fn repeatable_readers_all_get_in() {
    let (granted, manager) = race(IsolationLevel::Repeatable, 8, |m, tx, t| {
        m.read_lock(tx, t).unwrap()
    });
    assert_eq!(granted, 8);
    assert_eq!(manager.table().reader_count(&"Hot:1".into()), 8);
}

#[test]
fn held_writer_refuses_racing_readers() {
    for level in [
        IsolationLevel::Committed,
        IsolationLevel::Repeatable,
        IsolationLevel::Serializable,
    ] {
        let manager = Arc::new(LockManager::new(LockConfig::default()).unwrap());
        let owner = TransactionId::new("Writer");
        let hot = LockTarget::new("Hot:1", level);
        assert!(manager.write_lock(&owner, &hot).unwrap());

        let granted = race_on(Arc::clone(&manager), level, 8, |m, tx, t| {
            let granted = m.read_lock(tx, t).unwrap();
            let foreign_writer = m
                .table()
                .get_writer(t.key())
                .is_some_and(|w| !w.is_owned_by(tx));
            granted && foreign_writer
        });
        assert_eq!(granted, 0, "{level}");
        assert_eq!(manager.table().reader_count(hot.key()), 0, "{level}");
        assert!(manager.check_write(&owner, &hot).unwrap(), "{level}");
        assert!(check_table(manager.table(), level).is_empty(), "{level}");
    }
}

#[test]
fn mixed_repeatable_race_never_mixes_reader_and_writer() {
    let (_, manager) = race(IsolationLevel::Repeatable, 8, |m, tx, t| {
        let wants_write = tx.as_str().ends_with(['0', '2', '4', '6']);
        if wants_write {
            m.write_lock(tx, t).unwrap()
        } else {
            m.read_lock(tx, t).unwrap()
        }
    });
    assert!(check_table(manager.table(), IsolationLevel::Repeatable).is_empty());
}

#[test]
fn contention_workload_is_clean_at_every_level() {
    for level in IsolationLevel::ALL {
        let manager = Arc::new(LockManager::new(LockConfig::default()).unwrap());
        let config = StressConfig {
            operations: 8_000,
            threads: 8,
            keys: 4,
            level,
            ..Default::default()
        };
        let result = stress_contention(Arc::clone(&manager), &config);
        assert!(result.is_clean(), "{level}: {result:?}");

        let stats = manager.stats().snapshot();
        assert_eq!(stats.retries_exhausted, 0, "{level}");
    }
}

//! The lock table.
//!
//! Maps object keys to their lock state. A single mutex guards the map and
//! the sweep bookkeeping; every public operation is one critical section,
//! so get-or-create, insert and remove-if-empty are atomic with respect to
//! each other.
//!
//! ## Housekeeping
//!
//! Before each operation the table checks whether `sweep_interval` has
//! passed since the previous sweep. If so it inspects up to `sweep_batch`
//! slots, continuing after the slot where the previous pass stopped, and
//! reclaims entries older than `lock_timeout`. Slots left empty are removed.

mod slot;
mod sweep;

pub use sweep::SweepReport;

use crate::clock::SharedClock;
use crate::config::{LockConfig, ReaderExpiry};
use crate::entry::LockEntry;
use crate::stats::LockStats;
use crate::types::{ObjectKey, TransactionId};
use parking_lot::Mutex;
use slot::ObjectLockState;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Contents of one slot, read in the same critical section as every other
/// slot of a [`LockTable::snapshot`].
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    /// Object key.
    pub key: ObjectKey,
    /// Writer entry, if any.
    pub writer: Option<LockEntry>,
    /// Reader entries.
    pub readers: Vec<LockEntry>,
}

struct TableInner {
    slots: BTreeMap<ObjectKey, ObjectLockState>,
    /// Clock reading at the last sweep.
    last_sweep: u64,
    /// Last key inspected by the previous sweep.
    cursor: Option<ObjectKey>,
}

/// Concurrent map from object key to lock state.
pub struct LockTable {
    inner: Mutex<TableInner>,
    clock: SharedClock,
    lock_timeout: Duration,
    sweep_interval: Duration,
    sweep_batch: usize,
    reader_expiry: ReaderExpiry,
    stats: Arc<LockStats>,
}

impl LockTable {
    /// Creates an empty table.
    pub fn new(config: &LockConfig, clock: SharedClock, stats: Arc<LockStats>) -> Self {
        let now = clock.now_millis();
        Self {
            inner: Mutex::new(TableInner {
                slots: BTreeMap::new(),
                last_sweep: now,
                cursor: None,
            }),
            clock,
            lock_timeout: config.lock_timeout,
            sweep_interval: config.sweep_interval,
            sweep_batch: config.sweep_batch,
            reader_expiry: config.reader_expiry,
            stats,
        }
    }

    /// Returns the current clock reading.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Returns the writer entry of `key`, if any.
    #[must_use]
    pub fn get_writer(&self, key: &ObjectKey) -> Option<LockEntry> {
        let inner = self.lock();
        inner.slots.get(key).and_then(|s| s.writer().cloned())
    }

    /// Returns all reader entries of `key`; empty when there are none.
    #[must_use]
    pub fn get_readers(&self, key: &ObjectKey) -> Vec<LockEntry> {
        let inner = self.lock();
        inner
            .slots
            .get(key)
            .map(|s| s.readers().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of readers of `key`.
    #[must_use]
    pub fn reader_count(&self, key: &ObjectKey) -> usize {
        let inner = self.lock();
        inner.slots.get(key).map_or(0, ObjectLockState::reader_count)
    }

    /// Registers `entry` as a reader of `key`.
    ///
    /// Always returns true once inserted; conflicts with writers are the
    /// caller's to resolve by re-reading the writer slot.
    pub fn try_add_reader(&self, key: &ObjectKey, entry: LockEntry) -> bool {
        let mut inner = self.lock();
        inner.slots.entry(key.clone()).or_default().add_reader(entry);
        true
    }

    /// Removes the reader entry of `transaction_id` from `key`.
    pub fn remove_reader(&self, key: &ObjectKey, transaction_id: &TransactionId) {
        let mut inner = self.lock();
        if let Some(slot) = inner.slots.get_mut(key) {
            slot.remove_reader(transaction_id);
            if slot.is_empty() {
                inner.slots.remove(key);
            }
        }
    }

    /// Clears the writer slot held by `entry`'s transaction.
    pub fn remove_writer(&self, entry: &LockEntry) {
        let key = entry.object_key();
        let mut inner = self.lock();
        if let Some(slot) = inner.slots.get_mut(key) {
            slot.clear_writer(entry.transaction_id());
            if slot.is_empty() {
                inner.slots.remove(key);
            }
        }
    }

    /// Installs `entry` as the writer of `key`.
    ///
    /// Succeeds when the slot is free or already held by the same
    /// transaction. Returns false if another transaction won the slot.
    pub fn try_set_writer(&self, key: &ObjectKey, entry: LockEntry) -> bool {
        let mut inner = self.lock();
        inner.slots.entry(key.clone()).or_default().set_writer(entry)
    }

    /// Installs `entry` as the writer of `key` provided no other
    /// transaction reads or writes it, absorbing the caller's own reader.
    pub fn try_set_exclusive_writer(&self, key: &ObjectKey, entry: LockEntry) -> bool {
        let mut inner = self.lock();
        inner
            .slots
            .entry(key.clone())
            .or_default()
            .set_exclusive_writer(entry)
    }

    /// Registers `entry` as the only reader of `key`.
    ///
    /// Returns false if a writer or a reader of another transaction is
    /// present.
    pub fn try_add_sole_reader(&self, key: &ObjectKey, entry: LockEntry) -> bool {
        let mut inner = self.lock();
        inner.slots.entry(key.clone()).or_default().add_sole_reader(entry)
    }

    /// Replaces the reader entry of `reader_entry`'s transaction with a
    /// writer entry stamped now.
    ///
    /// Returns false if the reader is gone or another transaction holds the
    /// writer slot.
    pub fn upgrade(&self, reader_entry: &LockEntry) -> bool {
        let now = self.now();
        let mut inner = self.lock();
        inner
            .slots
            .get_mut(reader_entry.object_key())
            .is_some_and(|slot| slot.upgrade(reader_entry.transaction_id(), now))
    }

    /// Returns true if `transaction_id` holds a read lock on `key`.
    #[must_use]
    pub fn has_read_lock(&self, key: &ObjectKey, transaction_id: &TransactionId) -> bool {
        let inner = self.lock();
        inner
            .slots
            .get(key)
            .is_some_and(|s| s.reader(transaction_id).is_some())
    }

    /// Returns the reader entry of `transaction_id` on `key`.
    #[must_use]
    pub fn get_reader(&self, key: &ObjectKey, transaction_id: &TransactionId) -> Option<LockEntry> {
        let inner = self.lock();
        inner
            .slots
            .get(key)
            .and_then(|s| s.reader(transaction_id).cloned())
    }

    /// Removes every entry owned by `transaction_id`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_transaction(&self, transaction_id: &TransactionId) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;
        inner.slots.retain(|_, slot| {
            if slot.clear_writer(transaction_id) {
                removed += 1;
            }
            if slot.remove_reader(transaction_id).is_some() {
                removed += 1;
            }
            !slot.is_empty()
        });
        removed
    }

    /// Returns true if `key` has any lock state.
    #[must_use]
    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.lock().slots.contains_key(key)
    }

    /// Returns the number of locked objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// Returns true if no object is locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the keys of all locked objects.
    #[must_use]
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.lock().slots.keys().cloned().collect()
    }

    /// Returns the contents of every slot, read under one lock acquisition.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        let inner = self.lock();
        inner
            .slots
            .iter()
            .map(|(key, slot)| SlotSnapshot {
                key: key.clone(),
                writer: slot.writer().cloned(),
                readers: slot.readers().cloned().collect(),
            })
            .collect()
    }

    /// Runs a sweep pass now, ignoring the rate limit.
    pub fn sweep_now(&self) -> SweepReport {
        let now = self.now();
        let mut inner = self.inner.lock();
        self.sweep(&mut inner, now)
    }

    /// Acquires the table mutex, sweeping first when one is due.
    fn lock(&self) -> parking_lot::MutexGuard<'_, TableInner> {
        let now = self.now();
        let mut inner = self.inner.lock();
        let elapsed = Duration::from_millis(now.saturating_sub(inner.last_sweep));
        if elapsed >= self.sweep_interval {
            self.sweep(&mut inner, now);
        }
        inner
    }
}

impl std::fmt::Debug for LockTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockTable")
            .field("slots", &self.inner.lock().slots.len())
            .field("lock_timeout", &self.lock_timeout)
            .field("sweep_interval", &self.sweep_interval)
            .field("sweep_batch", &self.sweep_batch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{IsolationLevel, LockKind};

    fn table_with(config: LockConfig) -> (LockTable, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let table = LockTable::new(&config, clock.clone(), Arc::new(LockStats::new()));
        (table, clock)
    }

    fn table() -> (LockTable, Arc<ManualClock>) {
        table_with(LockConfig::default())
    }

    fn key() -> ObjectKey {
        ObjectKey::from("A:1")
    }

    fn reader(tx: &str, ts: u64) -> LockEntry {
        LockEntry::reader(key(), tx.into(), ts, IsolationLevel::Committed)
    }

    fn writer(tx: &str, ts: u64) -> LockEntry {
        LockEntry::writer(key(), tx.into(), ts, IsolationLevel::Committed)
    }

    #[test]
    fn missing_key_is_unlocked() {
        let (table, _) = table();
        assert!(table.get_writer(&key()).is_none());
        assert!(table.get_readers(&key()).is_empty());
        assert!(!table.has_read_lock(&key(), &"T1".into()));
        assert!(table.is_empty());
    }

    #[test]
    fn add_and_remove_reader() {
        let (table, _) = table();
        assert!(table.try_add_reader(&key(), reader("T1", 0)));
        assert!(table.try_add_reader(&key(), reader("T2", 0)));
        assert!(table.has_read_lock(&key(), &"T1".into()));
        assert_eq!(table.reader_count(&key()), 2);

        table.remove_reader(&key(), &"T1".into());
        assert!(!table.has_read_lock(&key(), &"T1".into()));
        assert!(table.contains(&key()));

        table.remove_reader(&key(), &"T2".into());
        assert!(!table.contains(&key()));
    }

    #[test]
    fn re_adding_reader_does_not_duplicate() {
        let (table, _) = table();
        table.try_add_reader(&key(), reader("T1", 0));
        table.try_add_reader(&key(), reader("T1", 5));
        let readers = table.get_readers(&key());
        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].timestamp(), 5);
    }

    #[test]
    fn writer_slot_is_exclusive() {
        let (table, _) = table();
        assert!(table.try_set_writer(&key(), writer("T1", 0)));
        assert!(!table.try_set_writer(&key(), writer("T2", 0)));
        assert!(table.get_writer(&key()).unwrap().is_owned_by(&"T1".into()));

        // only the owner can clear it
        table.remove_writer(&writer("T2", 0));
        assert!(table.get_writer(&key()).is_some());
        table.remove_writer(&writer("T1", 0));
        assert!(table.get_writer(&key()).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn failed_set_writer_keeps_single_slot() {
        let (table, _) = table();
        table.try_set_writer(&key(), writer("T1", 0));
        assert!(!table.try_set_writer(&key(), writer("T2", 0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn exclusive_writer_refused_by_foreign_reader() {
        let (table, _) = table();
        table.try_add_reader(&key(), reader("T2", 0));
        assert!(!table.try_set_exclusive_writer(&key(), writer("T1", 0)));
        assert!(table.get_writer(&key()).is_none());

        table.remove_reader(&key(), &"T2".into());
        assert!(table.try_set_exclusive_writer(&key(), writer("T1", 0)));
        assert!(!table.try_add_sole_reader(&key(), reader("T3", 0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn snapshot_lists_every_slot() {
        let (table, _) = table();
        let other = ObjectKey::from("B:1");
        table.try_add_reader(&key(), reader("T2", 0));
        table.try_set_writer(&key(), writer("T1", 0));
        table.try_set_writer(
            &other,
            LockEntry::writer(other.clone(), "T3".into(), 0, IsolationLevel::Committed),
        );

        let snapshot = table.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].key, key());
        assert!(snapshot[0].writer.as_ref().unwrap().is_owned_by(&"T1".into()));
        assert_eq!(snapshot[0].readers.len(), 1);
        assert_eq!(snapshot[1].key, other);
        assert!(snapshot[1].readers.is_empty());
    }

    #[test]
    fn remove_writer_keeps_slot_with_readers() {
        let (table, _) = table();
        table.try_add_reader(&key(), reader("T2", 0));
        table.try_set_writer(&key(), writer("T1", 0));
        table.remove_writer(&writer("T1", 0));
        assert!(table.contains(&key()));
        assert_eq!(table.reader_count(&key()), 1);
    }

    #[test]
    fn upgrade_leaves_no_residual_reader() {
        let (table, clock) = table();
        table.try_add_reader(&key(), reader("T1", 0));
        clock.advance(Duration::from_millis(20));

        assert!(table.upgrade(&reader("T1", 0)));
        assert!(!table.has_read_lock(&key(), &"T1".into()));
        let w = table.get_writer(&key()).unwrap();
        assert_eq!(w.kind(), LockKind::Write);
        assert_eq!(w.timestamp(), 20);
    }

    #[test]
    fn upgrade_without_reader_fails() {
        let (table, _) = table();
        assert!(!table.upgrade(&reader("T1", 0)));
        assert!(table.is_empty());
    }

    #[test]
    fn remove_transaction_clears_everything_owned() {
        let (table, _) = table();
        let other = ObjectKey::from("B:2");
        table.try_set_writer(&key(), writer("T1", 0));
        table.try_add_reader(
            &other,
            LockEntry::reader(other.clone(), "T1".into(), 0, IsolationLevel::Committed),
        );
        table.try_add_reader(
            &other,
            LockEntry::reader(other.clone(), "T2".into(), 0, IsolationLevel::Committed),
        );

        assert_eq!(table.remove_transaction(&"T1".into()), 2);
        assert!(!table.contains(&key()));
        assert_eq!(table.reader_count(&other), 1);
    }

    #[test]
    fn expired_writer_is_swept_on_next_call() {
        let config = LockConfig::new()
            .lock_timeout(Duration::from_millis(100))
            .sweep_interval(Duration::from_millis(10));
        let (table, clock) = table_with(config);

        table.try_set_writer(&key(), writer("T1", 0));
        clock.advance(Duration::from_millis(150));

        assert!(table.get_writer(&key()).is_none());
        assert!(!table.contains(&key()));
    }

    #[test]
    fn sweep_is_rate_limited() {
        let config = LockConfig::new()
            .lock_timeout(Duration::from_millis(100))
            .sweep_interval(Duration::from_millis(500));
        let (table, clock) = table_with(config);

        table.try_set_writer(&key(), writer("T1", 0));
        clock.advance(Duration::from_millis(150));
        // expired but no sweep is due yet
        assert!(table.get_writer(&key()).is_some());

        clock.advance(Duration::from_millis(400));
        assert!(table.get_writer(&key()).is_none());
    }

    #[test]
    fn bulk_reader_expiry_uses_oldest_reader() {
        let config = LockConfig::new()
            .lock_timeout(Duration::from_millis(100))
            .sweep_interval(Duration::ZERO);
        let (table, clock) = table_with(config);

        table.try_add_reader(&key(), reader("T1", 0));
        clock.advance(Duration::from_millis(90));
        table.try_add_reader(&key(), reader("T2", 90));
        clock.advance(Duration::from_millis(20));

        // T1 is 110ms old: both readers go, including the 20ms old one
        assert!(table.get_readers(&key()).is_empty());
        assert!(!table.contains(&key()));
    }

    #[test]
    fn individual_reader_expiry_keeps_young_readers() {
        let config = LockConfig::new()
            .lock_timeout(Duration::from_millis(100))
            .sweep_interval(Duration::ZERO)
            .reader_expiry(ReaderExpiry::Individual);
        let (table, clock) = table_with(config);

        table.try_add_reader(&key(), reader("T1", 0));
        clock.advance(Duration::from_millis(90));
        table.try_add_reader(&key(), reader("T2", 90));
        clock.advance(Duration::from_millis(20));

        let readers = table.get_readers(&key());
        assert_eq!(readers.len(), 1);
        assert!(readers[0].is_owned_by(&"T2".into()));
    }

    #[test]
    fn sweep_batch_bounds_each_pass_and_resumes() {
        let config = LockConfig::new()
            .lock_timeout(Duration::from_millis(100))
            .sweep_interval(Duration::from_secs(3600))
            .sweep_batch(2);
        let (table, clock) = table_with(config);

        for i in 0..5 {
            let k = ObjectKey::new(format!("A:{i}"));
            let entry = LockEntry::writer(k.clone(), "T1".into(), 0, IsolationLevel::Committed);
            table.try_set_writer(&k, entry);
        }
        clock.advance(Duration::from_millis(200));

        let first = table.sweep_now();
        assert_eq!(first.slots_scanned, 2);
        assert_eq!(first.writers_expired, 2);
        assert_eq!(first.slots_removed, 2);

        let second = table.sweep_now();
        assert_eq!(second.slots_scanned, 2);
        assert_eq!(second.slots_removed, 2);

        let third = table.sweep_now();
        assert_eq!(third.slots_scanned, 1);
        assert!(table.is_empty());
    }

    #[test]
    fn sweep_keeps_live_entries() {
        let config = LockConfig::new().lock_timeout(Duration::from_millis(100));
        let (table, clock) = table_with(config);

        table.try_set_writer(&key(), writer("T1", 0));
        clock.advance(Duration::from_millis(50));
        let report = table.sweep_now();
        assert_eq!(report.slots_scanned, 1);
        assert!(report.is_idle());
        assert!(table.get_writer(&key()).is_some());
    }
}

//! Lock manager facade.
//!
//! The entry point used by the transaction layer. For each call the manager
//! works out the target's isolation level, picks the matching strategy and
//! delegates. It holds no lock of its own; the only synchronization is the
//! lock table's internal mutex.

use crate::clock::{MonotonicClock, SharedClock};
use crate::config::LockConfig;
use crate::error::LockResult;
use crate::registry::IsolationRegistry;
use crate::selector::StrategySelector;
use crate::stats::LockStats;
use crate::strategy::{LockStrategy, StrategyContext};
use crate::table::{LockTable, SweepReport};
use crate::types::{IsolationLevel, ObjectKey, TransactionId};
use std::sync::Arc;
use tracing::debug;

/// How a lock target names its isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockClass<'a> {
    /// The level is known directly.
    Level(IsolationLevel),
    /// The level is configured for this persistent class in the registry.
    Named(&'a str),
}

/// An object the lock manager can lock.
///
/// Implemented by the editing-context layer for its persistent objects.
pub trait Lockable {
    /// Canonical identity of the object.
    fn lock_key(&self) -> ObjectKey;

    /// The object's class, or its isolation level directly.
    fn lock_class(&self) -> LockClass<'_>;
}

/// A key with an explicit isolation level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTarget {
    key: ObjectKey,
    level: IsolationLevel,
}

impl LockTarget {
    /// Creates a target.
    pub fn new(key: impl Into<ObjectKey>, level: IsolationLevel) -> Self {
        Self {
            key: key.into(),
            level,
        }
    }

    /// Returns the target's key.
    #[must_use]
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Returns the target's isolation level.
    #[must_use]
    pub fn level(&self) -> IsolationLevel {
        self.level
    }
}

impl Lockable for LockTarget {
    fn lock_key(&self) -> ObjectKey {
        self.key.clone()
    }

    fn lock_class(&self) -> LockClass<'_> {
        LockClass::Level(self.level)
    }
}

/// A key belonging to a persistent class resolved through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassObject {
    class: String,
    key: ObjectKey,
}

impl ClassObject {
    /// Creates a class-bound target.
    pub fn new(class: impl Into<String>, key: impl Into<ObjectKey>) -> Self {
        Self {
            class: class.into(),
            key: key.into(),
        }
    }

    /// Returns the class name.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }
}

impl Lockable for ClassObject {
    fn lock_key(&self) -> ObjectKey {
        self.key.clone()
    }

    fn lock_class(&self) -> LockClass<'_> {
        LockClass::Named(&self.class)
    }
}

/// Grants, checks and releases object locks for transactions.
pub struct LockManager {
    config: LockConfig,
    table: Arc<LockTable>,
    selector: StrategySelector,
    registry: IsolationRegistry,
    stats: Arc<LockStats>,
}

impl LockManager {
    /// Creates a manager with a monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Config`](crate::LockError::Config) if the
    /// configuration is invalid.
    pub fn new(config: LockConfig) -> LockResult<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Creates a manager stamping entries with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Config`](crate::LockError::Config) if the
    /// configuration is invalid.
    pub fn with_clock(config: LockConfig, clock: SharedClock) -> LockResult<Self> {
        config.validate()?;
        let stats = Arc::new(LockStats::new());
        let table = Arc::new(LockTable::new(&config, clock, Arc::clone(&stats)));
        let ctx =
            StrategyContext::new(Arc::clone(&table), config.retry.clone(), Arc::clone(&stats));
        Ok(Self {
            config,
            table,
            selector: StrategySelector::new(ctx),
            registry: IsolationRegistry::new(),
            stats,
        })
    }

    /// Sets the registry used to resolve [`LockClass::Named`] targets.
    #[must_use]
    pub fn with_registry(mut self, registry: IsolationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Acquires a read lock on `target`.
    pub fn read_lock(&self, tx: &TransactionId, target: &impl Lockable) -> LockResult<bool> {
        self.acquire("read_lock", tx, target, |s, tx, key| s.read_lock(tx, key))
    }

    /// Acquires a write lock on `target`.
    pub fn write_lock(&self, tx: &TransactionId, target: &impl Lockable) -> LockResult<bool> {
        self.acquire("write_lock", tx, target, |s, tx, key| s.write_lock(tx, key))
    }

    /// Upgrades a read lock on `target` to a write lock.
    pub fn upgrade_lock(&self, tx: &TransactionId, target: &impl Lockable) -> LockResult<bool> {
        self.acquire("upgrade_lock", tx, target, |s, tx, key| s.upgrade_lock(tx, key))
    }

    /// Releases the locks `tx` holds on `target`.
    pub fn release_lock(&self, tx: &TransactionId, target: &impl Lockable) -> LockResult<bool> {
        let (key, level) = self.resolve(target)?;
        self.selector.select(level).release_lock(tx, &key)
    }

    /// Returns true if `tx` may read `target`.
    pub fn check_read(&self, tx: &TransactionId, target: &impl Lockable) -> LockResult<bool> {
        let (key, level) = self.resolve(target)?;
        self.selector.select(level).check_read(tx, &key)
    }

    /// Returns true if `tx` holds the write lock on `target`.
    pub fn check_write(&self, tx: &TransactionId, target: &impl Lockable) -> LockResult<bool> {
        let (key, level) = self.resolve(target)?;
        self.selector.select(level).check_write(tx, &key)
    }

    /// Releases `tx`'s locks on every target, returning how many releases
    /// succeeded.
    pub fn release_all<'a, T>(
        &self,
        tx: &TransactionId,
        targets: impl IntoIterator<Item = &'a T>,
    ) -> LockResult<usize>
    where
        T: Lockable + 'a,
    {
        let mut released = 0;
        for target in targets {
            if self.release_lock(tx, target)? {
                released += 1;
            }
        }
        Ok(released)
    }

    /// Drops every lock entry owned by `tx`, whatever object it is on.
    ///
    /// Intended for transaction abort paths where the set of locked objects
    /// is not known.
    pub fn release_transaction(&self, tx: &TransactionId) -> usize {
        let removed = self.table.remove_transaction(tx);
        if removed > 0 {
            debug!(transaction = %tx, entries = removed, "released all locks of transaction");
        }
        removed
    }

    /// Returns the strategy that handles `level`.
    #[must_use]
    pub fn strategy(&self, level: IsolationLevel) -> &dyn LockStrategy {
        self.selector.select(level)
    }

    /// Runs a sweep pass now.
    pub fn sweep_now(&self) -> SweepReport {
        self.table.sweep_now()
    }

    /// Returns the shared lock table.
    #[must_use]
    pub fn table(&self) -> &Arc<LockTable> {
        &self.table
    }

    /// Returns the lock statistics.
    #[must_use]
    pub fn stats(&self) -> &LockStats {
        &self.stats
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Returns the class registry.
    #[must_use]
    pub fn registry(&self) -> &IsolationRegistry {
        &self.registry
    }

    fn resolve(&self, target: &impl Lockable) -> LockResult<(ObjectKey, IsolationLevel)> {
        let level = match target.lock_class() {
            LockClass::Level(level) => level,
            LockClass::Named(class) => self.registry.resolve(class)?,
        };
        Ok((target.lock_key(), level))
    }

    fn acquire(
        &self,
        operation: &'static str,
        tx: &TransactionId,
        target: &impl Lockable,
        op: impl FnOnce(&dyn LockStrategy, &TransactionId, &ObjectKey) -> LockResult<bool>,
    ) -> LockResult<bool> {
        let (key, level) = self.resolve(target)?;
        let granted = op(self.selector.select(level), tx, &key)?;
        self.stats.record_acquire(granted);
        if !granted {
            debug!(operation, transaction = %tx, object = %key, %level, "lock refused");
        }
        Ok(granted)
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::LockError;
    use std::time::Duration;

    fn manager() -> LockManager {
        manager_with(LockConfig::default()).0
    }

    fn manager_with(config: LockConfig) -> (LockManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (LockManager::with_clock(config, clock.clone()).unwrap(), clock)
    }

    fn tx(id: &str) -> TransactionId {
        TransactionId::new(id)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = LockManager::new(LockConfig::new().sweep_batch(0));
        assert!(matches!(result, Err(LockError::Config { .. })));
    }

    #[test]
    fn repeatable_write_conflict_and_handover() {
        let m = manager();
        let a = LockTarget::new("A:1", IsolationLevel::Repeatable);

        assert!(m.write_lock(&tx("T1"), &a).unwrap());
        assert!(!m.write_lock(&tx("T2"), &a).unwrap());
        assert!(m.release_lock(&tx("T1"), &a).unwrap());
        assert!(m.write_lock(&tx("T2"), &a).unwrap());

        let snap = m.stats().snapshot();
        assert_eq!(snap.grants, 2);
        assert_eq!(snap.conflicts, 1);
        assert_eq!(snap.releases, 1);
    }

    #[test]
    fn repeatable_two_readers_block_upgrade() {
        let m = manager();
        let a = LockTarget::new("A:1", IsolationLevel::Repeatable);

        assert!(m.read_lock(&tx("T1"), &a).unwrap());
        assert!(m.read_lock(&tx("T2"), &a).unwrap());
        assert!(!m.write_lock(&tx("T1"), &a).unwrap());
    }

    #[test]
    fn serializable_single_reader() {
        let m = manager();
        let a = LockTarget::new("A:1", IsolationLevel::Serializable);

        assert!(m.read_lock(&tx("T1"), &a).unwrap());
        assert!(!m.read_lock(&tx("T2"), &a).unwrap());
        assert!(m.release_lock(&tx("T1"), &a).unwrap());
        assert!(m.read_lock(&tx("T2"), &a).unwrap());
    }

    #[test]
    fn timed_out_writer_is_reclaimed() {
        let config = LockConfig::new()
            .lock_timeout(Duration::from_millis(100))
            .sweep_interval(Duration::from_millis(100));
        let (m, clock) = manager_with(config);
        let a = LockTarget::new("A:1", IsolationLevel::Repeatable);

        assert!(m.write_lock(&tx("T1"), &a).unwrap());
        clock.advance(Duration::from_millis(150));

        assert!(m.table().get_writer(a.key()).is_none());
        assert!(m.table().is_empty());
        assert!(m.write_lock(&tx("T2"), &a).unwrap());
        assert_eq!(m.stats().snapshot().writers_expired, 1);
    }

    #[test]
    fn uncommitted_reads_ignore_writers() {
        let m = manager();
        let a = LockTarget::new("A:1", IsolationLevel::Uncommitted);

        assert!(m.write_lock(&tx("T1"), &a).unwrap());
        assert!(m.read_lock(&tx("T2"), &a).unwrap());
        assert!(m.check_read(&tx("T2"), &a).unwrap());
        assert_eq!(m.table().len(), 1);
    }

    #[test]
    fn no_lock_levels_never_touch_the_table() {
        let m = manager();
        for level in [IsolationLevel::Optimistic, IsolationLevel::None] {
            let a = LockTarget::new("A:1", level);
            assert!(m.read_lock(&tx("T1"), &a).unwrap());
            assert!(m.write_lock(&tx("T2"), &a).unwrap());
            assert!(m.upgrade_lock(&tx("T1"), &a).unwrap());
            assert!(!m.check_write(&tx("T2"), &a).unwrap());
            assert!(!m.release_lock(&tx("T2"), &a).unwrap());
        }
        assert!(m.table().is_empty());
    }

    #[test]
    fn class_targets_resolve_through_registry() {
        let registry = IsolationRegistry::new()
            .with_default(IsolationLevel::Committed)
            .with_class("Order", IsolationLevel::Serializable);
        let m = manager().with_registry(registry);

        let order = ClassObject::new("Order", "Order:1");
        assert!(m.read_lock(&tx("T1"), &order).unwrap());
        assert!(!m.read_lock(&tx("T2"), &order).unwrap());

        let customer = ClassObject::new("Customer", "Customer:1");
        assert!(m.read_lock(&tx("T1"), &customer).unwrap());
        assert!(m.read_lock(&tx("T2"), &customer).unwrap());
    }

    #[test]
    fn unknown_class_is_an_error() {
        let m = manager();
        let err = m
            .read_lock(&tx("T1"), &ClassObject::new("Order", "Order:1"))
            .unwrap_err();
        assert!(matches!(err, LockError::UnknownClass { .. }));
        assert!(m.table().is_empty());
    }

    #[test]
    fn release_all_and_release_transaction() {
        let m = manager();
        let targets: Vec<_> = (0..3)
            .map(|i| LockTarget::new(format!("A:{i}"), IsolationLevel::Committed))
            .collect();
        for t in &targets {
            assert!(m.read_lock(&tx("T1"), t).unwrap());
        }
        assert_eq!(m.release_all(&tx("T1"), &targets).unwrap(), 3);
        assert!(m.table().is_empty());

        for t in &targets {
            m.write_lock(&tx("T2"), t).unwrap();
        }
        assert_eq!(m.release_transaction(&tx("T2")), 3);
        assert!(m.table().is_empty());
    }

    #[test]
    fn release_correctness_for_locking_levels() {
        let m = manager();
        for level in [
            IsolationLevel::Committed,
            IsolationLevel::Repeatable,
            IsolationLevel::Serializable,
        ] {
            let a = LockTarget::new("A:1", level);
            m.read_lock(&tx("T1"), &a).unwrap();
            m.upgrade_lock(&tx("T1"), &a).unwrap();
            assert!(m.release_lock(&tx("T1"), &a).unwrap());
            assert!(!m.check_read(&tx("T1"), &a).unwrap());
            assert!(!m.check_write(&tx("T1"), &a).unwrap());
        }
    }
}

//! Lock service abstraction.
//!
//! [`LockService`] is the seam between the transaction layer and wherever
//! locks are actually kept. [`LockManager`] serves it in-process; a remote
//! implementation would forward the same six operations over a transport
//! and report I/O or decoding faults as
//! [`LockError::Transport`](crate::LockError::Transport), which callers can
//! tell apart from an `Ok(false)` conflict.

use crate::error::LockResult;
use crate::manager::{LockManager, LockTarget};
use crate::types::{IsolationLevel, ObjectKey, TransactionId};

/// The six lock operations, addressed by key and isolation level.
pub trait LockService: Send + Sync {
    /// Acquires a read lock.
    fn read_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool>;

    /// Acquires a write lock.
    fn write_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool>;

    /// Upgrades a read lock to a write lock.
    fn upgrade_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool>;

    /// Releases the transaction's locks on the object.
    fn release_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool>;

    /// Returns true if the transaction may read the object.
    fn check_read(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool>;

    /// Returns true if the transaction holds the write lock.
    fn check_write(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool>;
}

fn target(key: &ObjectKey, level: IsolationLevel) -> LockTarget {
    LockTarget::new(key.clone(), level)
}

impl LockService for LockManager {
    fn read_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool> {
        LockManager::read_lock(self, tx, &target(key, level))
    }

    fn write_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool> {
        LockManager::write_lock(self, tx, &target(key, level))
    }

    fn upgrade_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool> {
        LockManager::upgrade_lock(self, tx, &target(key, level))
    }

    fn release_lock(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool> {
        LockManager::release_lock(self, tx, &target(key, level))
    }

    fn check_read(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool> {
        LockManager::check_read(self, tx, &target(key, level))
    }

    fn check_write(
        &self,
        tx: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockResult<bool> {
        LockManager::check_write(self, tx, &target(key, level))
    }
}

//! Strategy for levels that take no locks.
//!
//! Optimistic and unlocked classes defer conflict detection to commit-time
//! version checks, so acquisition always succeeds and nothing is recorded.

use super::LockStrategy;
use crate::error::LockResult;
use crate::types::{IsolationLevel, ObjectKey, TransactionId};

/// Strategy for [`IsolationLevel::Optimistic`] and [`IsolationLevel::None`].
#[derive(Debug, Clone, Copy)]
pub struct NoLocking {
    level: IsolationLevel,
}

impl NoLocking {
    /// Creates the strategy for `level`.
    pub fn new(level: IsolationLevel) -> Self {
        Self { level }
    }
}

impl LockStrategy for NoLocking {
    fn isolation_level(&self) -> IsolationLevel {
        self.level
    }

    fn read_lock(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(true)
    }

    fn write_lock(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(true)
    }

    fn upgrade_lock(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(true)
    }

    fn release_lock(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(false)
    }

    fn check_read(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(false)
    }

    fn check_write(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(false)
    }
}

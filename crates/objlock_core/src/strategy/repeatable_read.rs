//! Repeatable-read strategy.
//!
//! Any number of transactions may read an object, but a writer is only
//! admitted when no other transaction reads it. A sole reader can upgrade
//! its own lock.

use super::{LockStrategy, StrategyContext};
use crate::error::LockResult;
use crate::types::{IsolationLevel, ObjectKey, TransactionId};

const LEVEL: IsolationLevel = IsolationLevel::Repeatable;

/// Strategy for [`IsolationLevel::Repeatable`].
#[derive(Debug, Clone)]
pub struct RepeatableRead {
    ctx: StrategyContext,
}

impl RepeatableRead {
    /// Creates the strategy over a shared context.
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

impl LockStrategy for RepeatableRead {
    fn isolation_level(&self) -> IsolationLevel {
        LEVEL
    }

    fn read_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        self.ctx.retry("read_lock", transaction_id, key, || {
            self.ctx.add_reader_unless_written(transaction_id, key, LEVEL)
        })
    }

    fn write_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        self.ctx.retry("write_lock", transaction_id, key, || {
            self.ctx.acquire_exclusive(transaction_id, key, LEVEL)
        })
    }

    fn upgrade_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        self.ctx.retry("upgrade_lock", transaction_id, key, || {
            self.ctx.acquire_exclusive(transaction_id, key, LEVEL)
        })
    }

    fn release_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        Ok(self.ctx.release_owned(transaction_id, key))
    }

    fn check_read(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        Ok(self.ctx.holds_read(transaction_id, key))
    }

    fn check_write(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        Ok(self.ctx.owns_writer(transaction_id, key))
    }
}

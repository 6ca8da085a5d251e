//! Read-uncommitted strategy.
//!
//! Readers are never registered, so reads are always allowed and never block
//! anyone. Only writers are tracked: one writer per object.

use super::{Attempt, LockStrategy, StrategyContext};
use crate::error::LockResult;
use crate::types::{IsolationLevel, ObjectKey, TransactionId};

/// Strategy for [`IsolationLevel::Uncommitted`].
#[derive(Debug, Clone)]
pub struct ReadUncommitted {
    ctx: StrategyContext,
}

impl ReadUncommitted {
    /// Creates the strategy over a shared context.
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

impl LockStrategy for ReadUncommitted {
    fn isolation_level(&self) -> IsolationLevel {
        IsolationLevel::Uncommitted
    }

    fn read_lock(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(true)
    }

    fn write_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        self.ctx.retry("write_lock", transaction_id, key, || {
            match self.ctx.table.get_writer(key) {
                None => self
                    .ctx
                    .claim_writer(transaction_id, key, IsolationLevel::Uncommitted),
                Some(writer) => Attempt::Done(writer.is_owned_by(transaction_id)),
            }
        })
    }

    fn upgrade_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        self.write_lock(transaction_id, key)
    }

    fn release_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        // no reader entries exist at this level, so only the writer matters
        self.ctx.release_owned(transaction_id, key);
        Ok(true)
    }

    fn check_read(&self, _transaction_id: &TransactionId, _key: &ObjectKey) -> LockResult<bool> {
        Ok(true)
    }

    fn check_write(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        Ok(self.ctx.owns_writer(transaction_id, key))
    }
}

//! Serializable strategy.
//!
//! An object has either a single reader or a single writer. Concurrent
//! readers are refused outright.

use super::{Attempt, LockStrategy, StrategyContext};
use crate::error::LockResult;
use crate::types::{IsolationLevel, ObjectKey, TransactionId};

const LEVEL: IsolationLevel = IsolationLevel::Serializable;

/// Strategy for [`IsolationLevel::Serializable`].
#[derive(Debug, Clone)]
pub struct Serializable {
    ctx: StrategyContext,
}

impl Serializable {
    /// Creates the strategy over a shared context.
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }

    fn read_attempt(&self, transaction_id: &TransactionId, key: &ObjectKey) -> Attempt {
        let table = &self.ctx.table;
        if let Some(writer) = table.get_writer(key) {
            return Attempt::Done(writer.is_owned_by(transaction_id));
        }
        let entry = self.ctx.reader_entry(transaction_id, key, LEVEL);
        if table.try_add_sole_reader(key, entry) {
            Attempt::Done(true)
        } else if table.get_writer(key).is_some() {
            // a writer slipped in; the next pass reports whose it is
            Attempt::Retry
        } else {
            Attempt::Done(false)
        }
    }
}

impl LockStrategy for Serializable {
    fn isolation_level(&self) -> IsolationLevel {
        LEVEL
    }

    fn read_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        self.ctx.retry("read_lock", transaction_id, key, || {
            self.read_attempt(transaction_id, key)
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

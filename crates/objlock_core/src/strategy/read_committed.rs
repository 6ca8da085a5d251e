//! Read-committed strategy.
//!
//! Readers are registered so that a reader never observes an object while
//! another transaction writes it. Writers do not look at readers: a write
//! lock can be granted while other transactions hold read locks, which is
//! what allows non-repeatable reads at this level.

use super::{Attempt, LockStrategy, StrategyContext};
use crate::error::LockResult;
use crate::types::{IsolationLevel, ObjectKey, TransactionId};

const LEVEL: IsolationLevel = IsolationLevel::Committed;

/// Strategy for [`IsolationLevel::Committed`].
#[derive(Debug, Clone)]
pub struct ReadCommitted {
    ctx: StrategyContext,
}

impl ReadCommitted {
    /// Creates the strategy over a shared context.
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }
}

impl LockStrategy for ReadCommitted {
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
            match self.ctx.table.get_writer(key) {
                None => self.ctx.claim_writer(transaction_id, key, LEVEL),
                Some(writer) => Attempt::Done(writer.is_owned_by(transaction_id)),
            }
        })
    }

    fn upgrade_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool> {
        self.ctx.retry("upgrade_lock", transaction_id, key, || {
            let table = &self.ctx.table;
            match table.get_writer(key) {
                None => match table.get_reader(key, transaction_id) {
                    Some(reader) => self.ctx.upgrade_reader(&reader),
                    None => self.ctx.claim_writer(transaction_id, key, LEVEL),
                },
                Some(writer) if writer.is_owned_by(transaction_id) => {
                    // a write lock taken while reading leaves the reader behind
                    table.remove_reader(key, transaction_id);
                    Attempt::Done(true)
                }
                Some(_) => Attempt::Done(false),
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{context, key, tx};

    fn strategy() -> ReadCommitted {
        ReadCommitted::new(context().0)
    }

    #[test]
    fn many_readers() {
        let s = strategy();
        assert!(s.read_lock(&tx("T1"), &key()).unwrap());
        assert!(s.read_lock(&tx("T2"), &key()).unwrap());
        assert_eq!(s.ctx.table().reader_count(&key()), 2);
    }

    #[test]
    fn readers_do_not_block_writers() {
        let s = strategy();
        assert!(s.read_lock(&tx("T1"), &key()).unwrap());
        assert!(s.write_lock(&tx("T2"), &key()).unwrap());
        assert!(s.check_write(&tx("T2"), &key()).unwrap());
    }

    #[test]
    fn writer_blocks_foreign_readers() {
        let s = strategy();
        assert!(s.write_lock(&tx("T1"), &key()).unwrap());
        assert!(!s.read_lock(&tx("T2"), &key()).unwrap());
        assert!(s.read_lock(&tx("T1"), &key()).unwrap());
        assert!(!s.ctx.table().has_read_lock(&key(), &tx("T2")));
    }

    #[test]
    fn single_writer() {
        let s = strategy();
        assert!(s.write_lock(&tx("T1"), &key()).unwrap());
        assert!(!s.write_lock(&tx("T2"), &key()).unwrap());
    }

    #[test]
    fn check_read_accepts_reader_or_writer() {
        let s = strategy();
        assert!(!s.check_read(&tx("T1"), &key()).unwrap());
        s.read_lock(&tx("T1"), &key()).unwrap();
        assert!(s.check_read(&tx("T1"), &key()).unwrap());

        let other = ObjectKey::new("B:1");
        s.write_lock(&tx("T1"), &other).unwrap();
        assert!(s.check_read(&tx("T1"), &other).unwrap());
        assert!(!s.check_read(&tx("T2"), &other).unwrap());
    }

    #[test]
    fn upgrade_leaves_no_residual_reader() {
        let s = strategy();
        s.read_lock(&tx("T1"), &key()).unwrap();
        assert!(s.upgrade_lock(&tx("T1"), &key()).unwrap());
        assert!(!s.ctx.table().has_read_lock(&key(), &tx("T1")));
        assert!(s.check_write(&tx("T1"), &key()).unwrap());
    }

    #[test]
    fn upgrade_after_write_lock_drops_reader() {
        let s = strategy();
        s.read_lock(&tx("T1"), &key()).unwrap();
        s.write_lock(&tx("T1"), &key()).unwrap();
        assert!(s.ctx.table().has_read_lock(&key(), &tx("T1")));

        assert!(s.upgrade_lock(&tx("T1"), &key()).unwrap());
        assert!(!s.ctx.table().has_read_lock(&key(), &tx("T1")));
    }

    #[test]
    fn upgrade_refused_when_foreign_writer() {
        let s = strategy();
        s.read_lock(&tx("T1"), &key()).unwrap();
        s.write_lock(&tx("T2"), &key()).unwrap();
        assert!(!s.upgrade_lock(&tx("T1"), &key()).unwrap());
    }

    #[test]
    fn release_clears_both_entries() {
        let s = strategy();
        s.read_lock(&tx("T1"), &key()).unwrap();
        s.write_lock(&tx("T1"), &key()).unwrap();

        assert!(s.release_lock(&tx("T1"), &key()).unwrap());
        assert!(!s.check_read(&tx("T1"), &key()).unwrap());
        assert!(!s.check_write(&tx("T1"), &key()).unwrap());
        assert!(s.ctx.table().is_empty());
    }

    #[test]
    fn release_without_lock_fails() {
        let s = strategy();
        assert!(!s.release_lock(&tx("T1"), &key()).unwrap());
        s.write_lock(&tx("T2"), &key()).unwrap();
        assert!(!s.release_lock(&tx("T1"), &key()).unwrap());
    }
}

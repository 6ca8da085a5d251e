//! Isolation strategies.
//!
//! Each isolation level maps to one [`LockStrategy`]. Strategies decide, from
//! the current contents of the lock table, whether a transaction may take a
//! read or write lock on an object. They keep no state between calls: every
//! operation re-reads the table, because other transactions mutate it
//! concurrently.
//!
//! When a strategy loses a race (another transaction changed the slot between
//! a read and a write), it re-evaluates from scratch. Retries are bounded by
//! the configured [`RetryPolicy`](crate::RetryPolicy).

mod no_locking;
mod read_committed;
mod read_uncommitted;
mod repeatable_read;
mod retry;
mod serializable;

pub use no_locking::NoLocking;
pub use read_committed::ReadCommitted;
pub use read_uncommitted::ReadUncommitted;
pub use repeatable_read::RepeatableRead;
pub use serializable::Serializable;

use crate::config::RetryPolicy;
use crate::entry::LockEntry;
use crate::error::LockResult;
use crate::stats::LockStats;
use crate::table::LockTable;
use crate::types::{IsolationLevel, ObjectKey, TransactionId};
use retry::Attempt;
use std::sync::Arc;

/// Lock acquisition rules for one isolation level.
///
/// All operations return `Ok(false)` for a conflict or for "no lock held";
/// errors are reserved for faults such as an exhausted retry budget.
pub trait LockStrategy: Send + Sync {
    /// The isolation level this strategy implements.
    fn isolation_level(&self) -> IsolationLevel;

    /// Acquires a read lock.
    fn read_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool>;

    /// Acquires a write lock.
    fn write_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool>;

    /// Turns a held read lock into a write lock.
    fn upgrade_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool>;

    /// Releases whatever the transaction holds on the object.
    fn release_lock(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool>;

    /// Returns true if the transaction may read the object.
    fn check_read(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool>;

    /// Returns true if the transaction holds the write lock.
    fn check_write(&self, transaction_id: &TransactionId, key: &ObjectKey) -> LockResult<bool>;
}

/// Collaborators shared by all strategies of one manager.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    table: Arc<LockTable>,
    retry: RetryPolicy,
    stats: Arc<LockStats>,
}

impl StrategyContext {
    /// Creates a context over a shared table.
    pub fn new(table: Arc<LockTable>, retry: RetryPolicy, stats: Arc<LockStats>) -> Self {
        Self {
            table,
            retry,
            stats,
        }
    }

    /// Returns the shared lock table.
    #[must_use]
    pub fn table(&self) -> &Arc<LockTable> {
        &self.table
    }

    fn reader_entry(
        &self,
        transaction_id: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockEntry {
        LockEntry::reader(key.clone(), transaction_id.clone(), self.table.now(), level)
    }

    fn writer_entry(
        &self,
        transaction_id: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> LockEntry {
        LockEntry::writer(key.clone(), transaction_id.clone(), self.table.now(), level)
    }

    fn owns_writer(&self, transaction_id: &TransactionId, key: &ObjectKey) -> bool {
        self.table
            .get_writer(key)
            .is_some_and(|w| w.is_owned_by(transaction_id))
    }

    /// Claims a free writer slot; a lost race asks for another attempt.
    fn claim_writer(
        &self,
        transaction_id: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> Attempt {
        let entry = self.writer_entry(transaction_id, key, level);
        if self.table.try_set_writer(key, entry) {
            Attempt::Done(true)
        } else {
            Attempt::Retry
        }
    }

    /// Upgrades the transaction's reader entry in place.
    fn upgrade_reader(&self, reader: &LockEntry) -> Attempt {
        if self.table.upgrade(reader) {
            self.stats.record_upgrade();
            Attempt::Done(true)
        } else {
            Attempt::Retry
        }
    }

    /// Registers a reader, backing out if a writer slipped in meanwhile.
    fn add_reader_unless_written(
        &self,
        transaction_id: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> Attempt {
        match self.table.get_writer(key) {
            Some(writer) => Attempt::Done(writer.is_owned_by(transaction_id)),
            None => {
                let entry = self.reader_entry(transaction_id, key, level);
                self.table.try_add_reader(key, entry);
                if self.table.get_writer(key).is_none() {
                    Attempt::Done(true)
                } else {
                    self.table.remove_reader(key, transaction_id);
                    Attempt::Retry
                }
            }
        }
    }

    /// Write acquisition shared by the repeatable and serializable levels:
    /// readers other than the caller block the writer.
    fn acquire_exclusive(
        &self,
        transaction_id: &TransactionId,
        key: &ObjectKey,
        level: IsolationLevel,
    ) -> Attempt {
        if let Some(writer) = self.table.get_writer(key) {
            return Attempt::Done(writer.is_owned_by(transaction_id));
        }
        let upgrading = self.table.has_read_lock(key, transaction_id);
        let entry = self.writer_entry(transaction_id, key, level);
        if self.table.try_set_exclusive_writer(key, entry) {
            if upgrading {
                self.stats.record_upgrade();
            }
            Attempt::Done(true)
        } else {
            self.exclusive_refused(key)
        }
    }

    /// Classifies a refused exclusive grant: a writer that appeared since
    /// the first read is a lost race, anything else is a conflict.
    fn exclusive_refused(&self, key: &ObjectKey) -> Attempt {
        if self.table.get_writer(key).is_some() {
            Attempt::Retry
        } else {
            Attempt::Done(false)
        }
    }

    /// Drops the caller's writer and reader entries.
    fn release_owned(&self, transaction_id: &TransactionId, key: &ObjectKey) -> bool {
        let mut released = false;
        if let Some(writer) = self.table.get_writer(key) {
            if writer.is_owned_by(transaction_id) {
                self.table.remove_writer(&writer);
                released = true;
            }
        }
        if self.table.has_read_lock(key, transaction_id) {
            self.table.remove_reader(key, transaction_id);
            released = true;
        }
        if released {
            self.stats.record_release();
        }
        released
    }

    fn holds_read(&self, transaction_id: &TransactionId, key: &ObjectKey) -> bool {
        self.table.has_read_lock(key, transaction_id) || self.owns_writer(transaction_id, key)
    }

    fn retry(
        &self,
        operation: &'static str,
        transaction_id: &TransactionId,
        key: &ObjectKey,
        attempt: impl FnMut() -> Attempt,
    ) -> LockResult<bool> {
        retry::run(
            &self.retry,
            &self.stats,
            operation,
            transaction_id,
            key,
            attempt,
        )
    }
}

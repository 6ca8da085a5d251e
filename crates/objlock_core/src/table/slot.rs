//! Per-object lock state.

use crate::config::ReaderExpiry;
use crate::entry::LockEntry;
use crate::types::TransactionId;
use std::collections::HashMap;
use std::time::Duration;

/// What a sweep removed from one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Expired {
    pub writer: bool,
    pub readers: usize,
}

/// Lock state of a single object: one writer slot plus readers keyed by
/// transaction.
#[derive(Debug, Default)]
pub(crate) struct ObjectLockState {
    writer: Option<LockEntry>,
    readers: HashMap<TransactionId, LockEntry>,
    /// Oldest timestamp among current readers; 0 when there are none.
    youngest_reader_timestamp: u64,
}

impl ObjectLockState {
    pub fn writer(&self) -> Option<&LockEntry> {
        self.writer.as_ref()
    }

    pub fn readers(&self) -> impl Iterator<Item = &LockEntry> {
        self.readers.values()
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    pub fn reader(&self, transaction_id: &TransactionId) -> Option<&LockEntry> {
        self.readers.get(transaction_id)
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }

    #[cfg(test)]
    pub fn youngest_reader_timestamp(&self) -> u64 {
        self.youngest_reader_timestamp
    }

    /// Inserts or replaces the reader entry of the entry's transaction.
    pub fn add_reader(&mut self, entry: LockEntry) {
        self.readers.insert(entry.transaction_id().clone(), entry);
        self.recompute_reader_boundary();
    }

    pub fn remove_reader(&mut self, transaction_id: &TransactionId) -> Option<LockEntry> {
        let removed = self.readers.remove(transaction_id);
        if removed.is_some() {
            self.recompute_reader_boundary();
        }
        removed
    }

    /// Installs `entry` as writer unless a different transaction holds the
    /// slot.
    pub fn set_writer(&mut self, entry: LockEntry) -> bool {
        match &self.writer {
            Some(current) if !current.is_owned_by(entry.transaction_id()) => false,
            _ => {
                self.writer = Some(entry);
                true
            }
        }
    }

    /// Installs `entry` as writer only if no other transaction holds a
    /// reader or the writer slot. The caller's own reader is absorbed.
    pub fn set_exclusive_writer(&mut self, entry: LockEntry) -> bool {
        let owner = entry.transaction_id();
        let foreign_reader = self.readers.keys().any(|tx| tx != owner);
        if foreign_reader || !self.set_writer(entry.clone()) {
            return false;
        }
        self.remove_reader(entry.transaction_id());
        true
    }

    /// Adds `entry` as reader only if the slot has no writer and no reader
    /// of another transaction.
    pub fn add_sole_reader(&mut self, entry: LockEntry) -> bool {
        let owner = entry.transaction_id();
        if self.writer.is_some() || self.readers.keys().any(|tx| tx != owner) {
            return false;
        }
        self.add_reader(entry);
        true
    }

    /// Clears the writer slot if `transaction_id` owns it.
    pub fn clear_writer(&mut self, transaction_id: &TransactionId) -> bool {
        if self
            .writer
            .as_ref()
            .is_some_and(|w| w.is_owned_by(transaction_id))
        {
            self.writer = None;
            true
        } else {
            false
        }
    }

    /// Replaces the transaction's reader with a writer stamped at `now`.
    pub fn upgrade(&mut self, transaction_id: &TransactionId, now: u64) -> bool {
        if self
            .writer
            .as_ref()
            .is_some_and(|w| !w.is_owned_by(transaction_id))
        {
            return false;
        }
        match self.remove_reader(transaction_id) {
            Some(reader) => {
                self.writer = Some(reader.as_writer(now));
                true
            }
            None => false,
        }
    }

    /// Drops entries older than `timeout`.
    pub fn expire(&mut self, now: u64, timeout: Duration, policy: ReaderExpiry) -> Expired {
        let mut expired = Expired::default();

        if self
            .writer
            .as_ref()
            .is_some_and(|w| w.is_expired(now, timeout))
        {
            self.writer = None;
            expired.writer = true;
        }

        if self.readers.is_empty() {
            return expired;
        }

        match policy {
            ReaderExpiry::Bulk => {
                let boundary_age = Duration::from_millis(
                    now.saturating_sub(self.youngest_reader_timestamp),
                );
                if boundary_age > timeout {
                    expired.readers = self.readers.len();
                    self.readers.clear();
                    self.youngest_reader_timestamp = 0;
                }
            }
            ReaderExpiry::Individual => {
                let before = self.readers.len();
                self.readers.retain(|_, r| !r.is_expired(now, timeout));
                expired.readers = before - self.readers.len();
                if expired.readers > 0 {
                    self.recompute_reader_boundary();
                }
            }
        }

        expired
    }

    fn recompute_reader_boundary(&mut self) {
        self.youngest_reader_timestamp = self
            .readers
            .values()
            .map(LockEntry::timestamp)
            .min()
            .unwrap_or(0);
    }
}

//! Lock entries.

use crate::types::{IsolationLevel, LockKind, ObjectKey, TransactionId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of one lock grant.
///
/// Entries are never mutated once built. Refreshing the timestamp or turning
/// a read entry into a write entry produces a replacement, so the sweep
/// always sees a consistent timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    object_key: ObjectKey,
    transaction_id: TransactionId,
    timestamp: u64,
    isolation_level: IsolationLevel,
    kind: LockKind,
}

impl LockEntry {
    /// Creates a new entry stamped at `timestamp` milliseconds.
    pub fn new(
        object_key: ObjectKey,
        transaction_id: TransactionId,
        timestamp: u64,
        isolation_level: IsolationLevel,
        kind: LockKind,
    ) -> Self {
        Self {
            object_key,
            transaction_id,
            timestamp,
            isolation_level,
            kind,
        }
    }

    /// Creates a read entry.
    pub fn reader(
        object_key: ObjectKey,
        transaction_id: TransactionId,
        timestamp: u64,
        isolation_level: IsolationLevel,
    ) -> Self {
        Self::new(object_key, transaction_id, timestamp, isolation_level, LockKind::Read)
    }

    /// Creates a write entry.
    pub fn writer(
        object_key: ObjectKey,
        transaction_id: TransactionId,
        timestamp: u64,
        isolation_level: IsolationLevel,
    ) -> Self {
        Self::new(object_key, transaction_id, timestamp, isolation_level, LockKind::Write)
    }

    /// Returns the locked object's key.
    #[must_use]
    pub fn object_key(&self) -> &ObjectKey {
        &self.object_key
    }

    /// Returns the owning transaction.
    #[must_use]
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Returns the acquisition time in milliseconds.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the isolation level the lock was taken under.
    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    /// Returns the lock kind.
    #[must_use]
    pub fn kind(&self) -> LockKind {
        self.kind
    }

    /// Returns true if `transaction_id` owns this entry.
    #[must_use]
    pub fn is_owned_by(&self, transaction_id: &TransactionId) -> bool {
        &self.transaction_id == transaction_id
    }

    /// Returns a copy stamped at `now`.
    #[must_use]
    pub fn refreshed(&self, now: u64) -> Self {
        Self {
            timestamp: now,
            ..self.clone()
        }
    }

    /// Returns the write entry an upgrade of this entry produces.
    #[must_use]
    pub fn as_writer(&self, now: u64) -> Self {
        Self {
            timestamp: now,
            kind: LockKind::Write,
            ..self.clone()
        }
    }

    /// Returns how old the entry is at `now`.
    #[must_use]
    pub fn age(&self, now: u64) -> Duration {
        Duration::from_millis(now.saturating_sub(self.timestamp))
    }

    /// Returns true if the entry is older than `timeout` at `now`.
    #[must_use]
    pub fn is_expired(&self, now: u64, timeout: Duration) -> bool {
        self.age(now) > timeout
    }
}

//! Lock manager statistics.
//!
//! Counters are atomic and can be read while lock traffic is in progress.
//!
//! # Usage
//!
//! ```rust
//! use objlock_core::{IsolationLevel, LockConfig, LockManager, LockTarget, TransactionId};
//!
//! let manager = LockManager::new(LockConfig::default()).unwrap();
//! let tx = TransactionId::new("T1");
//! let order = LockTarget::new("Order:1", IsolationLevel::Repeatable);
//!
//! assert!(manager.write_lock(&tx, &order).unwrap());
//! assert_eq!(manager.stats().snapshot().grants, 1);
//! ```

use crate::table::SweepReport;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock statistics.
#[derive(Debug, Default)]
pub struct LockStats {
    // Acquisition counters
    /// Acquisitions that succeeded.
    grants: AtomicU64,
    /// Acquisitions refused because another transaction holds the object.
    conflicts: AtomicU64,
    /// Successful upgrades of a read lock to a write lock.
    upgrades: AtomicU64,
    /// Successful releases.
    releases: AtomicU64,

    // Contention counters
    /// Lost races that were retried.
    retries: AtomicU64,
    /// Calls that ran out of retry budget.
    retries_exhausted: AtomicU64,

    // Sweep counters
    /// Sweep passes run.
    sweeps: AtomicU64,
    /// Writer entries reclaimed by sweeps.
    writers_expired: AtomicU64,
    /// Reader entries reclaimed by sweeps.
    readers_expired: AtomicU64,
}

impl LockStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of an acquisition.
    pub(crate) fn record_acquire(&self, granted: bool) {
        if granted {
            self.grants.fetch_add(1, Ordering::Relaxed);
        } else {
            self.conflicts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_upgrade(&self) {
        self.upgrades.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retries_exhausted(&self) {
        self.retries_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sweep(&self, report: &SweepReport) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.writers_expired
            .fetch_add(report.writers_expired as u64, Ordering::Relaxed);
        self.readers_expired
            .fetch_add(report.readers_expired as u64, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            grants: self.grants.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            upgrades: self.upgrades.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            retries_exhausted: self.retries_exhausted.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            writers_expired: self.writers_expired.load(Ordering::Relaxed),
            readers_expired: self.readers_expired.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.grants.store(0, Ordering::Relaxed);
        self.conflicts.store(0, Ordering::Relaxed);
        self.upgrades.store(0, Ordering::Relaxed);
        self.releases.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.retries_exhausted.store(0, Ordering::Relaxed);
        self.sweeps.store(0, Ordering::Relaxed);
        self.writers_expired.store(0, Ordering::Relaxed);
        self.readers_expired.store(0, Ordering::Relaxed);
    }
}

/// Immutable copy of [`LockStats`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Acquisitions that succeeded.
    pub grants: u64,
    /// Acquisitions refused.
    pub conflicts: u64,
    /// Read-to-write upgrades.
    pub upgrades: u64,
    /// Successful releases.
    pub releases: u64,
    /// Lost races that were retried.
    pub retries: u64,
    /// Calls that ran out of retry budget.
    pub retries_exhausted: u64,
    /// Sweep passes run.
    pub sweeps: u64,
    /// Writer entries reclaimed by sweeps.
    pub writers_expired: u64,
    /// Reader entries reclaimed by sweeps.
    pub readers_expired: u64,
}

impl StatsSnapshot {
    /// Fraction of acquisitions that were refused.
    #[must_use]
    pub fn conflict_ratio(&self) -> f64 {
        let total = self.grants + self.conflicts;
        if total == 0 {
            0.0
        } else {
            self.conflicts as f64 / total as f64
        }
    }
}

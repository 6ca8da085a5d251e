//! Timeout sweep.

use super::{LockTable, TableInner};
use crate::types::ObjectKey;
use std::ops::Bound;
use tracing::debug;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Slots inspected.
    pub slots_scanned: usize,
    /// Writer entries reclaimed.
    pub writers_expired: usize,
    /// Reader entries reclaimed.
    pub readers_expired: usize,
    /// Slots removed because they became empty.
    pub slots_removed: usize,
}

impl SweepReport {
    /// Returns true if the pass reclaimed nothing.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.writers_expired == 0 && self.readers_expired == 0
    }
}

impl LockTable {
    pub(super) fn sweep(&self, inner: &mut TableInner, now: u64) -> SweepReport {
        inner.last_sweep = now;

        let batch = self.sweep_batch.min(inner.slots.len());
        let mut keys: Vec<ObjectKey> = Vec::with_capacity(batch);
        if let Some(cursor) = &inner.cursor {
            keys.extend(
                inner
                    .slots
                    .range::<ObjectKey, _>((Bound::Excluded(cursor.clone()), Bound::Unbounded))
                    .take(batch)
                    .map(|(k, _)| k.clone()),
            );
        }
        // wrap around to the start of the key space
        let remaining = batch - keys.len();
        keys.extend(inner.slots.keys().take(remaining).cloned());

        let mut report = SweepReport {
            slots_scanned: keys.len(),
            ..SweepReport::default()
        };

        for key in &keys {
            let Some(slot) = inner.slots.get_mut(key) else {
                continue;
            };
            let expired = slot.expire(now, self.lock_timeout, self.reader_expiry);
            if expired.writer {
                report.writers_expired += 1;
            }
            report.readers_expired += expired.readers;
            if slot.is_empty() {
                inner.slots.remove(key);
                report.slots_removed += 1;
            }
        }

        inner.cursor = keys.pop();

        self.stats.record_sweep(&report);
        if !report.is_idle() {
            debug!(
                scanned = report.slots_scanned,
                writers = report.writers_expired,
                readers = report.readers_expired,
                removed = report.slots_removed,
                "expired stale lock entries"
            );
        }

        report
    }
}

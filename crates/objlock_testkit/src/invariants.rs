//! Lock table invariant checks.
//!
//! Inspect a quiescent table and report every state a workload run at a
//! single isolation level must never leave behind.

use objlock_core::{IsolationLevel, LockKind, LockTable, ObjectKey, SlotSnapshot, TransactionId};
use std::fmt;

/// A broken lock table invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A writer coexists with a reader of another transaction.
    ForeignReaderUnderWriter {
        /// Object key.
        key: ObjectKey,
        /// Writer's transaction.
        writer: TransactionId,
        /// Reader's transaction.
        reader: TransactionId,
    },
    /// More than one reader at the serializable level.
    MultipleReaders {
        /// Object key.
        key: ObjectKey,
        /// Readers present.
        count: usize,
    },
    /// A reader registered at a level that never tracks readers.
    UntrackedReader {
        /// Object key.
        key: ObjectKey,
        /// Reader's transaction.
        reader: TransactionId,
    },
    /// A no-lock level created table entries.
    NoLockEntries {
        /// Object key.
        key: ObjectKey,
    },
    /// An entry stored in the wrong slot or with the wrong kind.
    MisfiledEntry {
        /// Slot the entry was found in.
        key: ObjectKey,
        /// Transaction of the entry.
        transaction: TransactionId,
    },
    /// A slot without writer and readers was left in the table.
    EmptySlot {
        /// Object key.
        key: ObjectKey,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ForeignReaderUnderWriter {
                key,
                writer,
                reader,
            } => write!(f, "{key}: reader {reader} coexists with writer {writer}"),
            Violation::MultipleReaders { key, count } => {
                write!(f, "{key}: {count} readers at serializable level")
            }
            Violation::UntrackedReader { key, reader } => {
                write!(f, "{key}: reader {reader} registered at read-uncommitted level")
            }
            Violation::NoLockEntries { key } => write!(f, "{key}: entries under a no-lock level"),
            Violation::MisfiledEntry { key, transaction } => {
                write!(f, "{key}: misfiled entry of {transaction}")
            }
            Violation::EmptySlot { key } => write!(f, "{key}: empty slot left in table"),
        }
    }
}

/// Checks every slot of `table` against the rules of `level`.
///
/// Returns an empty vector when the table is consistent. All slots are
/// read from one [`LockTable::snapshot`], so a sweep cannot run between
/// the reads of a slot's writer and readers. Call it only while no other
/// thread mutates the table.
pub fn check_table(table: &LockTable, level: IsolationLevel) -> Vec<Violation> {
    let mut violations = Vec::new();

    for SlotSnapshot {
        key,
        writer,
        readers,
    } in table.snapshot()
    {
        if writer.is_none() && readers.is_empty() {
            violations.push(Violation::EmptySlot { key: key.clone() });
            continue;
        }

        if !level.uses_lock_table() {
            violations.push(Violation::NoLockEntries { key: key.clone() });
            continue;
        }

        let misfiled = writer
            .iter()
            .filter(|w| w.object_key() != &key || w.kind() != LockKind::Write)
            .chain(
                readers
                    .iter()
                    .filter(|r| r.object_key() != &key || r.kind() != LockKind::Read),
            );
        for entry in misfiled {
            violations.push(Violation::MisfiledEntry {
                key: key.clone(),
                transaction: entry.transaction_id().clone(),
            });
        }

        match level {
            IsolationLevel::Uncommitted => {
                for reader in &readers {
                    violations.push(Violation::UntrackedReader {
                        key: key.clone(),
                        reader: reader.transaction_id().clone(),
                    });
                }
            }
            IsolationLevel::Repeatable | IsolationLevel::Serializable => {
                if let Some(writer) = &writer {
                    let foreign = readers
                        .iter()
                        .filter(|r| !r.is_owned_by(writer.transaction_id()));
                    for reader in foreign {
                        violations.push(Violation::ForeignReaderUnderWriter {
                            key: key.clone(),
                            writer: writer.transaction_id().clone(),
                            reader: reader.transaction_id().clone(),
                        });
                    }
                }
                if level == IsolationLevel::Serializable && readers.len() > 1 {
                    violations.push(Violation::MultipleReaders {
                        key: key.clone(),
                        count: readers.len(),
                    });
                }
            }
            _ => {}
        }
    }

    violations
}

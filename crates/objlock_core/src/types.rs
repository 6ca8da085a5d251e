//! Core type definitions.

use crate::error::LockError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Canonical identity of a persistent object.
///
/// The key is opaque to the lock subsystem. Callers must hand in the same
/// string for the same logical object on every call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Creates a new object key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ObjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for ObjectKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of an in-flight transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Creates a transaction ID from an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random transaction ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Isolation level configured for a persistent class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// Dirty reads allowed; only writers are tracked.
    #[serde(alias = "read-uncommitted")]
    Uncommitted,
    /// Readers never see uncommitted writes; writers ignore readers.
    #[serde(alias = "read-committed")]
    Committed,
    /// Readers block foreign writers.
    #[serde(alias = "repeatable-read")]
    Repeatable,
    /// A single reader or a single writer per object.
    Serializable,
    /// No locks; conflicts are detected at commit by version checks.
    Optimistic,
    /// No locks at all.
    None,
}

impl IsolationLevel {
    /// All levels, strongest last among the locking ones.
    pub const ALL: [IsolationLevel; 6] = [
        IsolationLevel::Uncommitted,
        IsolationLevel::Committed,
        IsolationLevel::Repeatable,
        IsolationLevel::Serializable,
        IsolationLevel::Optimistic,
        IsolationLevel::None,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uncommitted => "uncommitted",
            Self::Committed => "committed",
            Self::Repeatable => "repeatable",
            Self::Serializable => "serializable",
            Self::Optimistic => "optimistic",
            Self::None => "none",
        }
    }

    /// Returns true if this level registers entries in the lock table.
    #[must_use]
    pub const fn uses_lock_table(self) -> bool {
        !matches!(self, Self::Optimistic | Self::None)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IsolationLevel {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "uncommitted" | "read-uncommitted" => Ok(Self::Uncommitted),
            "committed" | "read-committed" => Ok(Self::Committed),
            "repeatable" | "repeatable-read" => Ok(Self::Repeatable),
            "serializable" => Ok(Self::Serializable),
            "optimistic" => Ok(Self::Optimistic),
            "none" => Ok(Self::None),
            _ => Err(LockError::config(format!("unknown isolation level: {s:?}"))),
        }
    }
}

/// Kind of lock held by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    /// Shared read lock.
    Read,
    /// Exclusive write lock.
    Write,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

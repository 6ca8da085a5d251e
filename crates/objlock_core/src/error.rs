//! Error types for the lock subsystem.
//!
//! A lock conflict is not an error: acquisition calls report it as
//! `Ok(false)`. Only faults the caller cannot resolve by retrying the
//! business transaction end up here.

use std::io;
use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur in lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Invalid or unknown configuration value.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A persistent class has no isolation level configured.
    #[error("no isolation level configured for class {class}")]
    UnknownClass {
        /// The class name that was looked up.
        class: String,
    },

    /// The retry budget ran out while racing other transactions.
    #[error(
        "{operation} on {object_key} for {transaction_id} gave up after {attempts} attempts"
    )]
    RetriesExhausted {
        /// The strategy operation that was retried.
        operation: &'static str,
        /// The contended object.
        object_key: String,
        /// The transaction that gave up.
        transaction_id: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Fault in a remote lock service transport.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Configuration document could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl LockError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unknown class error.
    pub fn unknown_class(class: impl Into<String>) -> Self {
        Self::UnknownClass {
            class: class.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        Self::Transport {
            message: message.into(),
            retryable,
        }
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetriesExhausted { .. } => true,
            Self::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

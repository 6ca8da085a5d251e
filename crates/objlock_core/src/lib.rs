//! # objlock core
//!
//! Object-level pessimistic locking for ORM transactions.
//!
//! This crate provides:
//! - A concurrent lock table with one writer slot and a reader set per object
//! - Isolation strategies for read-uncommitted, read-committed,
//!   repeatable-read and serializable classes, plus a no-op strategy for
//!   optimistic and unlocked classes
//! - A lock manager facade that resolves a target's isolation level and
//!   delegates to the matching strategy
//! - Timeout-based reclamation of stale entries through a rate-limited sweep
//!
//! ## Example
//!
//! ```rust
//! use objlock_core::{IsolationLevel, LockConfig, LockManager, LockTarget, TransactionId};
//!
//! let manager = LockManager::new(LockConfig::default()).unwrap();
//! let order = LockTarget::new("Order:42", IsolationLevel::Repeatable);
//! let t1 = TransactionId::new("T1");
//! let t2 = TransactionId::new("T2");
//!
//! assert!(manager.write_lock(&t1, &order).unwrap());
//! assert!(!manager.write_lock(&t2, &order).unwrap());
//! assert!(manager.release_lock(&t1, &order).unwrap());
//! assert!(manager.write_lock(&t2, &order).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod entry;
mod error;
mod manager;
mod registry;
mod selector;
mod service;
mod stats;
pub mod strategy;
mod table;
mod types;

pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock};
pub use config::{LockConfig, ReaderExpiry, RetryPolicy};
pub use entry::LockEntry;
pub use error::{LockError, LockResult};
pub use manager::{ClassObject, LockClass, LockManager, LockTarget, Lockable};
pub use registry::IsolationRegistry;
pub use selector::StrategySelector;
pub use service::LockService;
pub use stats::{LockStats, StatsSnapshot};
pub use strategy::{LockStrategy, StrategyContext};
pub use table::{LockTable, SlotSnapshot, SweepReport};
pub use types::{IsolationLevel, LockKind, ObjectKey, TransactionId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # objlock testkit
//!
//! Test utilities for objlock.
//!
//! This crate provides:
//! - Fixtures: managers driven by a manual clock, registry files
//! - Property-based test generators using proptest
//! - Lock table invariant checks
//! - Multi-threaded contention harness
//!
//! ## Usage
//!
//! ```rust
//! use objlock_testkit::prelude::*;
//! use objlock_core::IsolationLevel;
//!
//! let m = TestManager::new();
//! let a = target("A:1", IsolationLevel::Serializable);
//! assert!(m.read_lock(&tx("T1"), &a).unwrap());
//! assert!(check_table(m.table(), IsolationLevel::Serializable).is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod invariants;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::invariants::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use invariants::*;
pub use stress::*;

//! Test fixtures.
//!
//! Lock managers whose clock only moves when the test says so, plus
//! helpers for ids, targets and registry files.

use objlock_core::{
    IsolationLevel, IsolationRegistry, LockConfig, LockManager, LockTarget, ManualClock,
    TransactionId,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A lock manager paired with the manual clock that drives it.
pub struct TestManager {
    manager: LockManager,
    clock: Arc<ManualClock>,
}

impl TestManager {
    /// Creates a manager with the default configuration at t = 0.
    pub fn new() -> Self {
        Self::with_config(LockConfig::default())
    }

    /// Creates a manager with `config` at t = 0.
    pub fn with_config(config: LockConfig) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let manager =
            LockManager::with_clock(config, clock.clone()).expect("Invalid test configuration");
        Self { manager, clock }
    }

    /// Creates a manager whose locks time out after 100ms, sweeping at most
    /// every 100ms.
    pub fn short_timeout() -> Self {
        Self::with_config(short_timeout_config())
    }

    /// Replaces the class registry.
    #[must_use]
    pub fn with_registry(mut self, registry: IsolationRegistry) -> Self {
        self.manager = self.manager.with_registry(registry);
        self
    }

    /// Returns the manual clock.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Returns the manager.
    pub fn manager(&self) -> &LockManager {
        &self.manager
    }
}

impl Default for TestManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestManager {
    type Target = LockManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

/// Configuration with a 100ms lock timeout and sweep interval.
pub fn short_timeout_config() -> LockConfig {
    LockConfig::new()
        .lock_timeout(Duration::from_millis(100))
        .sweep_interval(Duration::from_millis(100))
}

/// Shorthand for a transaction id.
pub fn tx(id: &str) -> TransactionId {
    TransactionId::new(id)
}

/// Shorthand for a lock target.
pub fn target(key: &str, level: IsolationLevel) -> LockTarget {
    LockTarget::new(key, level)
}

/// Runs a test with a fresh manager.
///
/// # Example
///
/// ```rust
/// use objlock_testkit::{target, tx, with_manager};
/// use objlock_core::IsolationLevel;
///
/// with_manager(|m| {
///     let a = target("A:1", IsolationLevel::Repeatable);
///     assert!(m.write_lock(&tx("T1"), &a).unwrap());
/// });
/// ```
pub fn with_manager<F, R>(f: F) -> R
where
    F: FnOnce(&TestManager) -> R,
{
    let manager = TestManager::new();
    f(&manager)
}

/// An isolation map written to a temporary directory.
pub struct RegistryFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl RegistryFile {
    /// Writes `json` to a fresh temporary file.
    pub fn new(json: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("isolation.json");
        let mut file = std::fs::File::create(&path).expect("Failed to create registry file");
        file.write_all(json.as_bytes())
            .expect("Failed to write registry file");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file as a registry.
    pub fn load(&self) -> objlock_core::LockResult<IsolationRegistry> {
        IsolationRegistry::load(&self.path)
    }
}

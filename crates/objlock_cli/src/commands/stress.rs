//! Stress command implementation.

use objlock_core::{IsolationLevel, LockConfig, LockManager, StatsSnapshot};
use objlock_testkit::{stress_contention, StressConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Options of the stress command.
#[derive(Debug, Clone)]
pub struct StressOptions {
    /// Number of worker threads.
    pub threads: usize,
    /// Total number of operations.
    pub operations: usize,
    /// Number of distinct objects.
    pub keys: usize,
    /// Isolation level name.
    pub level: String,
    /// Share of operations that start with a read lock.
    pub read_ratio: f64,
    /// Share of granted reads that are upgraded.
    pub upgrade_ratio: f64,
    /// Lock timeout in milliseconds.
    pub timeout_ms: u64,
    /// Workload seed.
    pub seed: u64,
}

impl StressOptions {
    fn to_config(&self) -> Result<(LockConfig, StressConfig), Box<dyn std::error::Error>> {
        let level: IsolationLevel = self.level.parse()?;
        for (name, ratio) in [
            ("read ratio", self.read_ratio),
            ("upgrade ratio", self.upgrade_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(format!("{name} must be between 0 and 1, got {ratio}").into());
            }
        }
        if self.threads == 0 || self.keys == 0 {
            return Err("threads and keys must be positive".into());
        }

        let lock_config = LockConfig::new().lock_timeout(Duration::from_millis(self.timeout_ms));
        lock_config.validate()?;

        let stress_config = StressConfig {
            operations: self.operations,
            threads: self.threads,
            keys: self.keys,
            level,
            read_ratio: self.read_ratio,
            upgrade_ratio: self.upgrade_ratio,
            seed: self.seed,
            ..StressConfig::default()
        };
        Ok((lock_config, stress_config))
    }
}

/// Runs the stress command.
pub fn run(options: &StressOptions) -> Result<(), Box<dyn std::error::Error>> {
    let (lock_config, stress_config) = options.to_config()?;
    let manager = Arc::new(LockManager::new(lock_config)?);

    info!(
        level = %stress_config.level,
        threads = stress_config.threads,
        operations = stress_config.operations,
        keys = stress_config.keys,
        "starting stress run"
    );
    let result = stress_contention(Arc::clone(&manager), &stress_config);
    result.print_summary(&format!("Stress ({})", stress_config.level));
    print_stats(&manager.stats().snapshot());

    println!();
    if result.is_clean() {
        println!("✓ Stress run passed");
        Ok(())
    } else {
        warn!(
            violations = result.violations,
            table_violations = result.table_violations,
            errors = result.error_ops,
            remaining = result.remaining_slots,
            "stress run failed"
        );
        println!("✗ Stress run failed");
        Err("Stress run failed".into())
    }
}

fn print_stats(stats: &StatsSnapshot) {
    println!();
    println!("Lock statistics:");
    println!("  Grants:            {}", stats.grants);
    println!("  Conflicts:         {}", stats.conflicts);
    println!("  Conflict ratio:    {:.3}", stats.conflict_ratio());
    println!("  Upgrades:          {}", stats.upgrades);
    println!("  Releases:          {}", stats.releases);
    println!("  Retries:           {}", stats.retries);
    println!("  Retries exhausted: {}", stats.retries_exhausted);
    println!("  Sweeps:            {}", stats.sweeps);
    println!("  Expired writers:   {}", stats.writers_expired);
    println!("  Expired readers:   {}", stats.readers_expired);
}

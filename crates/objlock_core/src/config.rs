//! Lock manager configuration.

use crate::error::{LockError, LockResult};
use std::time::Duration;

/// How the sweep expires reader entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderExpiry {
    /// Clear every reader of an object once the oldest reader is older than
    /// the lock timeout.
    #[default]
    Bulk,
    /// Expire each reader by its own timestamp.
    Individual,
}

/// Configuration for opening a lock manager.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Age after which an entry is reclaimed by the sweep.
    pub lock_timeout: Duration,

    /// Minimum time between two sweeps.
    pub sweep_interval: Duration,

    /// Maximum number of object slots a single sweep inspects.
    pub sweep_batch: usize,

    /// Reader expiry policy.
    pub reader_expiry: ReaderExpiry,

    /// Retry behavior for lost races.
    pub retry: RetryPolicy,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(60_000),
            sweep_interval: Duration::from_millis(500),
            sweep_batch: 50,
            reader_expiry: ReaderExpiry::Bulk,
            retry: RetryPolicy::default(),
        }
    }
}

impl LockConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lock timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the minimum interval between sweeps.
    #[must_use]
    pub const fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets how many slots a sweep inspects.
    #[must_use]
    pub const fn sweep_batch(mut self, batch: usize) -> Self {
        self.sweep_batch = batch;
        self
    }

    /// Sets the reader expiry policy.
    #[must_use]
    pub const fn reader_expiry(mut self, policy: ReaderExpiry) -> Self {
        self.reader_expiry = policy;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checks the configuration for values the manager cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Config`] for a zero lock timeout, a zero sweep
    /// batch, or an invalid retry policy.
    pub fn validate(&self) -> LockResult<()> {
        if self.lock_timeout.is_zero() {
            return Err(LockError::config("lock_timeout must be greater than zero"));
        }
        if self.sweep_batch == 0 {
            return Err(LockError::config("sweep_batch must be greater than zero"));
        }
        self.retry.validate()
    }
}

/// Retry behavior for strategy operations that lose a race.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts; 0 retries until resolved.
    pub max_attempts: u32,
    /// Attempts that spin without sleeping.
    pub spin_attempts: u32,
    /// First sleep once spinning is over.
    pub initial_delay: Duration,
    /// Upper bound for a single sleep.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 256,
            spin_attempts: 64,
            initial_delay: Duration::from_micros(50),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt limit.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Creates a policy that retries forever without sleeping.
    #[must_use]
    pub fn unbounded_spin() -> Self {
        Self {
            max_attempts: 0,
            spin_attempts: u32::MAX,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the number of spinning attempts.
    #[must_use]
    pub fn with_spin_attempts(mut self, attempts: u32) -> Self {
        self.spin_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Returns true if attempts are unlimited.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts == 0
    }

    /// Total time spent sleeping before the attempt budget runs out.
    ///
    /// Returns `None` for an unbounded policy.
    #[must_use]
    pub fn worst_case_wait(&self) -> Option<Duration> {
        if self.is_unbounded() {
            return None;
        }
        Some(
            (1..self.max_attempts)
                .filter_map(|lost| self.delay_for(lost))
                .sum(),
        )
    }

    /// Delay before the attempt following `attempt` lost races.
    ///
    /// Returns `None` while still in the spinning phase.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.spin_attempts {
            return None;
        }
        let exponent = (attempt - self.spin_attempts).min(32);
        let factor = self.backoff_multiplier.powi(i32::try_from(exponent).unwrap_or(32));
        let max_nanos = self.max_delay.as_nanos() as f64;
        let nanos = (self.initial_delay.as_nanos() as f64 * factor.max(1.0)).min(max_nanos);
        Some(Duration::from_nanos(nanos as u64))
    }

    fn validate(&self) -> LockResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(LockError::config("backoff_multiplier must be at least 1.0"));
        }
        if self.initial_delay > self.max_delay {
            return Err(LockError::config("initial_delay must not exceed max_delay"));
        }
        Ok(())
    }
}

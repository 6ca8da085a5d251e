//! Retry loop for lost races.

use crate::config::RetryPolicy;
use crate::error::{LockError, LockResult};
use crate::stats::LockStats;
use crate::types::{ObjectKey, TransactionId};
use std::thread;
use tracing::{trace, warn};

/// Result of one evaluation of a strategy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    /// The outcome is final.
    Done(bool),
    /// A concurrent table mutation won the race; evaluate again.
    Retry,
}

/// Runs `attempt` until it produces a final outcome or the policy gives up.
pub(crate) fn run(
    policy: &RetryPolicy,
    stats: &LockStats,
    operation: &'static str,
    transaction_id: &TransactionId,
    key: &ObjectKey,
    mut attempt: impl FnMut() -> Attempt,
) -> LockResult<bool> {
    let mut lost: u32 = 0;
    loop {
        match attempt() {
            Attempt::Done(outcome) => return Ok(outcome),
            Attempt::Retry => {
                lost = lost.saturating_add(1);
                stats.record_retry();

                if !policy.is_unbounded() && lost >= policy.max_attempts {
                    stats.record_retries_exhausted();
                    warn!(
                        operation,
                        object = %key,
                        transaction = %transaction_id,
                        attempts = lost,
                        "retry budget exhausted"
                    );
                    return Err(LockError::RetriesExhausted {
                        operation,
                        object_key: key.to_string(),
                        transaction_id: transaction_id.to_string(),
                        attempts: lost,
                    });
                }

                trace!(operation, object = %key, attempt = lost, "lost race, retrying");
                match policy.delay_for(lost) {
                    Some(delay) => thread::sleep(delay),
                    None => std::hint::spin_loop(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (TransactionId, ObjectKey) {
        (TransactionId::new("T1"), ObjectKey::new("A:1"))
    }

    #[test]
    fn returns_first_final_outcome() {
        let (tx, key) = ids();
        let stats = LockStats::new();
        let mut calls = 0;
        let result = run(&RetryPolicy::default(), &stats, "read_lock", &tx, &key, || {
            calls += 1;
            if calls < 3 {
                Attempt::Retry
            } else {
                Attempt::Done(true)
            }
        });
        assert!(result.unwrap());
        assert_eq!(calls, 3);
        assert_eq!(stats.snapshot().retries, 2);
    }

    #[test]
    fn gives_up_after_budget() {
        let (tx, key) = ids();
        let stats = LockStats::new();
        let policy = RetryPolicy::new(5).with_spin_attempts(u32::MAX);
        let mut calls = 0;
        let result = run(&policy, &stats, "write_lock", &tx, &key, || {
            calls += 1;
            Attempt::Retry
        });
        match result {
            Err(LockError::RetriesExhausted { attempts, operation, .. }) => {
                assert_eq!(attempts, 5);
                assert_eq!(operation, "write_lock");
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(calls, 5);
        assert_eq!(stats.snapshot().retries_exhausted, 1);
    }

    #[test]
    fn unbounded_policy_keeps_going() {
        let (tx, key) = ids();
        let stats = LockStats::new();
        let mut calls = 0;
        let result = run(&RetryPolicy::unbounded_spin(), &stats, "read_lock", &tx, &key, || {
            calls += 1;
            if calls == 20_000 {
                Attempt::Done(false)
            } else {
                Attempt::Retry
            }
        });
        assert!(!result.unwrap());
    }
}

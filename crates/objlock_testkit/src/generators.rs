//! Property-based test generators using proptest.
//!
//! Transactions and keys are drawn from small pools so generated
//! sequences actually collide on the same objects.

use objlock_core::{IsolationLevel, LockManager, LockResult, LockTarget, ObjectKey, TransactionId};
use proptest::prelude::*;

/// One of the six lock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOp {
    /// `read_lock`
    Read,
    /// `write_lock`
    Write,
    /// `upgrade_lock`
    Upgrade,
    /// `release_lock`
    Release,
    /// `check_read`
    CheckRead,
    /// `check_write`
    CheckWrite,
}

impl LockOp {
    /// Every operation.
    pub const ALL: [LockOp; 6] = [
        LockOp::Read,
        LockOp::Write,
        LockOp::Upgrade,
        LockOp::Release,
        LockOp::CheckRead,
        LockOp::CheckWrite,
    ];

    /// Returns true for read, write and upgrade.
    pub fn is_acquisition(self) -> bool {
        matches!(self, LockOp::Read | LockOp::Write | LockOp::Upgrade)
    }
}

/// A single operation issued by a transaction against an object.
#[derive(Debug, Clone)]
pub struct LockStep {
    /// Issuing transaction.
    pub transaction: TransactionId,
    /// Target object.
    pub key: ObjectKey,
    /// Operation.
    pub op: LockOp,
}

impl LockStep {
    /// Runs the step against `manager` at `level`.
    pub fn apply(&self, manager: &LockManager, level: IsolationLevel) -> LockResult<bool> {
        let target = LockTarget::new(self.key.clone(), level);
        let tx = &self.transaction;
        match self.op {
            LockOp::Read => manager.read_lock(tx, &target),
            LockOp::Write => manager.write_lock(tx, &target),
            LockOp::Upgrade => manager.upgrade_lock(tx, &target),
            LockOp::Release => manager.release_lock(tx, &target),
            LockOp::CheckRead => manager.check_read(tx, &target),
            LockOp::CheckWrite => manager.check_write(tx, &target),
        }
    }
}

/// Strategy for any isolation level.
pub fn isolation_level_strategy() -> impl Strategy<Value = IsolationLevel> {
    prop::sample::select(IsolationLevel::ALL.to_vec())
}

/// Strategy for the levels that register readers in the lock table.
pub fn reader_tracking_level_strategy() -> impl Strategy<Value = IsolationLevel> {
    prop::sample::select(vec![
        IsolationLevel::Committed,
        IsolationLevel::Repeatable,
        IsolationLevel::Serializable,
    ])
}

/// Strategy for the levels that never touch the lock table.
pub fn no_lock_level_strategy() -> impl Strategy<Value = IsolationLevel> {
    prop::sample::select(vec![IsolationLevel::Optimistic, IsolationLevel::None])
}

/// Strategy for accepted spellings of level names.
pub fn level_name_strategy() -> impl Strategy<Value = (String, IsolationLevel)> {
    (isolation_level_strategy(), any::<bool>()).prop_map(|(level, upper)| {
        let name = level.name();
        let name = if upper {
            name.to_ascii_uppercase()
        } else {
            name.to_string()
        };
        (name, level)
    })
}

/// Strategy for transaction ids `T0..T{pool}`.
pub fn transaction_id_strategy(pool: usize) -> impl Strategy<Value = TransactionId> {
    (0..pool.max(1)).prop_map(|i| TransactionId::new(format!("T{i}")))
}

/// Strategy for object keys `Obj:0..Obj:{pool}`.
pub fn object_key_strategy(pool: usize) -> impl Strategy<Value = ObjectKey> {
    (0..pool.max(1)).prop_map(|i| ObjectKey::new(format!("Obj:{i}")))
}

/// Strategy for a single lock operation.
pub fn lock_op_strategy() -> impl Strategy<Value = LockOp> {
    prop::sample::select(LockOp::ALL.to_vec())
}

/// Strategy for a step over `transactions` transactions and `keys` keys.
pub fn lock_step_strategy(transactions: usize, keys: usize) -> impl Strategy<Value = LockStep> {
    (
        transaction_id_strategy(transactions),
        object_key_strategy(keys),
        lock_op_strategy(),
    )
        .prop_map(|(transaction, key, op)| LockStep {
            transaction,
            key,
            op,
        })
}

/// Strategy for a sequence of steps over three transactions and two keys.
pub fn lock_sequence_strategy(
    min_steps: usize,
    max_steps: usize,
) -> impl Strategy<Value = Vec<LockStep>> {
    prop::collection::vec(lock_step_strategy(3, 2), min_steps..max_steps)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

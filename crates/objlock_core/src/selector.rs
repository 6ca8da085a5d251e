//! Isolation level to strategy mapping.

use crate::strategy::{
    LockStrategy, NoLocking, ReadCommitted, ReadUncommitted, RepeatableRead, Serializable,
    StrategyContext,
};
use crate::types::IsolationLevel;

/// Holds one strategy instance per isolation level.
///
/// The mapping is exhaustive over [`IsolationLevel`]; misconfigured level
/// names are rejected when they are parsed, so there is no fallback level.
#[derive(Debug)]
pub struct StrategySelector {
    uncommitted: ReadUncommitted,
    committed: ReadCommitted,
    repeatable: RepeatableRead,
    serializable: Serializable,
    optimistic: NoLocking,
    none: NoLocking,
}

impl StrategySelector {
    /// Builds all strategies over the shared context.
    pub fn new(ctx: StrategyContext) -> Self {
        Self {
            uncommitted: ReadUncommitted::new(ctx.clone()),
            committed: ReadCommitted::new(ctx.clone()),
            repeatable: RepeatableRead::new(ctx.clone()),
            serializable: Serializable::new(ctx),
            optimistic: NoLocking::new(IsolationLevel::Optimistic),
            none: NoLocking::new(IsolationLevel::None),
        }
    }

    /// Returns the strategy for `level`.
    #[must_use]
    pub fn select(&self, level: IsolationLevel) -> &dyn LockStrategy {
        match level {
            IsolationLevel::Uncommitted => &self.uncommitted,
            IsolationLevel::Committed => &self.committed,
            IsolationLevel::Repeatable => &self.repeatable,
            IsolationLevel::Serializable => &self.serializable,
            IsolationLevel::Optimistic => &self.optimistic,
            IsolationLevel::None => &self.none,
        }
    }
}

// Deterministic execution context threaded through every state-transition
// handler (spec §5). Unlike the teacher's `TypeId`-keyed `Context`
// (a dependency-injection container used for wiring unrelated services),
// this carries only the handful of block-scoped values a deterministic
// handler is allowed to observe: nothing here may be read from the local
// clock, filesystem, or RNG.

use crate::time::BlockTime;

#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub chain_id: String,
    pub block_height: u64,
    pub block_time: BlockTime,
}

impl ExecutionContext {
    pub fn new(chain_id: impl Into<String>, block_height: u64, block_time: BlockTime) -> Self {
        ExecutionContext {
            chain_id: chain_id.into(),
            block_height,
            block_time,
        }
    }

    /// Convenience fixture for tests elsewhere in the workspace.
    pub fn for_test() -> Self {
        ExecutionContext::new("test-chain", 1, BlockTime::from_secs(1_700_000_000))
    }
}

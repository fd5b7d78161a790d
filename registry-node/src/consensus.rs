// The registry state machine assumes an external BFT consensus layer
// drives it (spec §1, §5): something else agrees on block contents and
// calls `begin_block`/`deliver_tx`/`end_block` in order. This trait is
// the seam a real deployment plugs a consensus engine into; `SoloDriver`
// is a single-process stand-in for local development and tests, applying
// one block per call with no peer agreement at all.

use registry_common::context::ExecutionContext;
use registry_common::error::ChainError;
use registry_common::time::BlockTime;
use registry_core::chain::Msg;
use registry_core::Chain;

pub trait ConsensusDriver {
    fn apply_block(&self, chain: &Chain, height: u64, block_time: BlockTime, txs: Vec<Msg>) -> Result<(), ChainError>;
}

pub struct SoloDriver {
    pub chain_id: String,
}

impl ConsensusDriver for SoloDriver {
    fn apply_block(&self, chain: &Chain, height: u64, block_time: BlockTime, txs: Vec<Msg>) -> Result<(), ChainError> {
        let ctx = ExecutionContext::new(self.chain_id.clone(), height, block_time);
        chain.begin_block(&ctx)?;
        for tx in txs {
            if let Err(e) = chain.deliver_tx(&ctx, tx) {
                if e.is_fatal() {
                    return Err(e);
                }
                log::warn!("rejected transaction at height {height}: {e}");
            }
        }
        chain.end_block(&ctx)?;
        Ok(())
    }
}

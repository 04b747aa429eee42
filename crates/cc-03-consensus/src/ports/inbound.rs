//! Driving ports (API exposed to other subsystems)

use crate::domain::ConsensusResult;
use async_trait::async_trait;
use shared_types::{Block, Consensus};

/// Entry point for blocks decided elsewhere: fetched by the synchronizer
/// or announced by a peer.
#[async_trait]
pub trait ReachedBlockSink: Send + Sync {
    async fn add_reached_block(&self, block: Block, consensus: Consensus) -> ConsensusResult<()>;

    /// Height of the local tip.
    async fn chain_height(&self) -> ConsensusResult<u64>;
}

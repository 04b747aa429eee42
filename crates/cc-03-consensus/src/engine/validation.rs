//! Checks on blocks that extend the local tip.

use super::ConsensusEngine;
use crate::domain::{ConsensusError, ConsensusResult};
use crate::ports::{Dapp, TransactionPool};
use cc_01_chain_ledger::KeyValueStore;
use cc_02_remote_nodes::PeerNetwork;
use shared_crypto::Hashable;
use shared_types::{Block, Consensus};

impl<S, D, N, P> ConsensusEngine<S, D, N, P>
where
    S: KeyValueStore,
    D: Dapp,
    N: PeerNetwork,
    P: TransactionPool,
{
    /// Validate `block` as the successor of the executed tip.
    pub(crate) async fn validate_block(&self, block: &Block) -> ConsensusResult<()> {
        let height = block.height();
        let invalid = |reason: &str| ConsensusError::InvalidBlock {
            height,
            reason: reason.to_string(),
        };

        if height == 1 {
            if block.hash() != self.blockchain.genesis_hash() {
                return Err(invalid("genesis mismatch"));
            }
            return Ok(());
        }

        let tip_height = height - 1;
        if self.execution.height != tip_height {
            return Err(ConsensusError::NotExecuted {
                height: tip_height,
                app_height: self.execution.height,
            });
        }
        let tip = self.blockchain.header_of(tip_height).await?;
        let tip_hash = tip.hash();
        if block.header.last_block_hash != tip_hash {
            return Err(invalid("last block hash mismatch"));
        }
        if block.header.timestamp < tip.timestamp {
            return Err(invalid("timestamp before parent"));
        }
        block
            .verify_body()
            .map_err(|e| invalid(&e.to_string()))?;

        let last_consensus = &block.body.last_block_consensus;
        if last_consensus.vote.height != tip_height || last_consensus.vote.block_hash != tip_hash {
            return Err(invalid("last consensus is not for the parent"));
        }
        let tip_validators = self.blockchain.validator_set_of(tip_height).await?;
        last_consensus.verify(&tip_validators, &self.blockchain.genesis_hash())?;

        if block.header.app_state_hash != self.execution.app_state_hash {
            return Err(invalid("app state hash mismatch"));
        }
        let next_validator_set = self.expected_next_validator_set(height).await?;
        if block.header.next_validator_set_root != next_validator_set.root() {
            return Err(invalid("next validator set mismatch"));
        }
        for transaction in block.transactions() {
            if !self.dapp.validate_transaction(transaction).await {
                return Err(invalid(&format!(
                    "transaction {} rejected by application",
                    transaction.hash()
                )));
            }
        }
        Ok(())
    }

    /// Check that `consensus` is a precommit quorum for `block`.
    pub(crate) async fn verify_commit(
        &self,
        block: &Block,
        consensus: &Consensus,
    ) -> ConsensusResult<()> {
        let height = block.height();
        if consensus.vote.height != height || consensus.vote.block_hash != block.hash() {
            return Err(ConsensusError::InvalidBlock {
                height,
                reason: "consensus is not for this block".into(),
            });
        }
        let validators = self.blockchain.validator_set_of(height).await?;
        consensus.verify(&validators, &self.blockchain.genesis_hash())?;
        Ok(())
    }
}

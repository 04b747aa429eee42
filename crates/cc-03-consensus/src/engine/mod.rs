//! # Consensus Engine
//!
//! Drives one node through heights: execute what is committed, agree on
//! the next block with the validator set, commit and announce it.
//!
//! Execution is pipelined one block behind agreement. Block `H + 1`
//! carries the application state after executing block `H`, so it can
//! only be constructed or validated once `H` has been executed.

mod rounds;
mod validation;


use crate::domain::{
    ConsensusConfig, ConsensusError, ConsensusResult, ExecutionState, HeightVoteSet,
    ProofBlockPolicy, Progress, RoundState,
};
use crate::ports::{Dapp, SystemTimeSource, TimeSource, TransactionPool};
use cc_01_chain_ledger::{Blockchain, KeyValueStore};
use cc_02_remote_nodes::{PeerNetwork, RemoteNodeSet};
use shared_crypto::{Address, Hash, Hashable, Signer};
use shared_types::{AppState, Block, Consensus, ConsensusMessage, Message, ValidatorSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Dependencies for ConsensusEngine
pub struct ConsensusDependencies<S, D, N, P> {
    pub blockchain: Arc<Blockchain<S>>,
    pub dapp: Arc<D>,
    pub network: Arc<N>,
    pub remote_nodes: Arc<RemoteNodeSet>,
    pub pool: Arc<P>,
    /// Absent on observer nodes.
    pub signer: Option<Arc<dyn Signer>>,
    pub config: ConsensusConfig,
}

pub struct ConsensusEngine<S, D, N, P> {
    blockchain: Arc<Blockchain<S>>,
    dapp: Arc<D>,
    network: Arc<N>,
    remote_nodes: Arc<RemoteNodeSet>,
    pool: Arc<P>,
    signer: Option<Arc<dyn Signer>>,
    config: ConsensusConfig,
    time_source: Box<dyn TimeSource>,
    initialized: bool,
    execution: ExecutionState,
    round: Option<RoundState>,
    /// Messages for the next height, replayed once we get there.
    future_messages: Vec<ConsensusMessage>,
}

impl<S, D, N, P> ConsensusEngine<S, D, N, P>
where
    S: KeyValueStore,
    D: Dapp,
    N: PeerNetwork,
    P: TransactionPool,
{
    pub fn new(deps: ConsensusDependencies<S, D, N, P>) -> Self {
        Self {
            blockchain: deps.blockchain,
            dapp: deps.dapp,
            network: deps.network,
            remote_nodes: deps.remote_nodes,
            pool: deps.pool,
            signer: deps.signer,
            config: deps.config,
            time_source: Box::new(SystemTimeSource),
            initialized: false,
            execution: ExecutionState::default(),
            round: None,
            future_messages: Vec::new(),
        }
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn blockchain(&self) -> &Arc<Blockchain<S>> {
        &self.blockchain
    }

    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last executed height.
    pub fn app_height(&self) -> u64 {
        self.execution.height
    }

    pub fn app_state_hash(&self) -> Hash {
        self.execution.app_state_hash
    }

    pub fn round_state(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    /// Ready the ledger, connect the application and start on the height
    /// above the tip.
    pub async fn initialize(&mut self) -> ConsensusResult<()> {
        self.blockchain.ready().await?;
        let app = self.dapp.connect().await.map_err(ConsensusError::Dapp)?;
        let chain_height = self.blockchain.height().await?;
        if app.height > chain_height {
            return Err(ConsensusError::NeedResetApp {
                app_height: app.height,
                chain_height,
            });
        }
        self.execution = ExecutionState::from(app);
        self.initialized = true;
        self.enter_height(chain_height + 1).await?;
        info!(
            "[cc-03] initialized at chain #{} (app #{})",
            chain_height, self.execution.height
        );
        Ok(())
    }

    pub(crate) fn ensure_initialized(&self) -> ConsensusResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ConsensusError::NotInitialized)
        }
    }

    /// Execute the lowest committed block the application has not seen.
    pub async fn execute_block_transactions(&mut self) -> ConsensusResult<AppState> {
        self.ensure_initialized()?;
        let chain_height = self.blockchain.height().await?;
        let height = self.execution.height + 1;
        if height > chain_height {
            return Err(ConsensusError::AllBlocksExecuted {
                height: self.execution.height,
            });
        }

        let block = self.blockchain.block_of(height).await?;
        let state = self
            .dapp
            .execute_transactions(block.transactions(), &block.header)
            .await
            .map_err(ConsensusError::Dapp)?;
        if state.height != height {
            return Err(ConsensusError::BlockHeightMismatch {
                expected: height,
                actual: state.height,
            });
        }
        self.execution.apply(&state);
        self.pool.update(block.transactions()).await;
        info!(
            "[cc-03] executed block #{} ({} txs), app state {}",
            height,
            block.transactions().len(),
            state.hash
        );
        Ok(state)
    }

    pub(crate) async fn catch_up_execution(&mut self) -> ConsensusResult<()> {
        while self.execution.height < self.blockchain.height().await? {
            self.execute_block_transactions().await?;
        }
        Ok(())
    }

    /// Build the block for the height above the tip, or `None` when there
    /// is nothing worth proposing.
    pub async fn construct_block(&mut self) -> ConsensusResult<Option<Block>> {
        self.ensure_initialized()?;
        let chain_height = self.blockchain.height().await?;
        if chain_height == 0 {
            return Ok(Some(self.blockchain.genesis_block().clone()));
        }
        if self.execution.height < chain_height {
            return Err(ConsensusError::NotExecuted {
                height: chain_height,
                app_height: self.execution.height,
            });
        }

        let height = chain_height + 1;
        let pending = self.pool.pending(self.config.max_block_transactions).await;
        let selected = if pending.is_empty() {
            None
        } else {
            self.dapp.select_transactions(pending).await
        };
        let transactions = match selected {
            Some(transactions) if !transactions.is_empty() => transactions,
            _ if self.proof_block_due(chain_height).await? => Vec::new(),
            _ => return Ok(None),
        };

        let tip = self.blockchain.header_of(chain_height).await?;
        let last_consensus = self.blockchain.consensus_of(chain_height).await?;
        let next_validator_set = self.expected_next_validator_set(height).await?;
        let timestamp = self.time_source.now().max(tip.timestamp);
        Ok(Some(Block::construct(
            height,
            timestamp,
            tip.hash(),
            next_validator_set.root(),
            self.execution.app_state_hash,
            transactions,
            last_consensus,
        )))
    }

    /// Whether a round should start: genesis is uncommitted, transactions
    /// are pending or the executed tip needs a proof block.
    pub async fn has_work(&self) -> ConsensusResult<bool> {
        let chain_height = self.blockchain.height().await?;
        if chain_height == 0 || !self.pool.is_empty() {
            return Ok(true);
        }
        self.proof_block_due(chain_height).await
    }

    async fn proof_block_due(&self, tip: u64) -> ConsensusResult<bool> {
        if self.execution.height < tip {
            return Ok(false);
        }
        Ok(match self.config.proof_block_policy {
            ProofBlockPolicy::TipHasTransactions => {
                !self.blockchain.body_of(tip).await?.transaction_list.is_empty()
            }
            ProofBlockPolicy::StateChanged => {
                self.blockchain.header_of(tip).await?.app_state_hash
                    != self.execution.app_state_hash
            }
        })
    }

    /// Set header `height` must announce: the application's pending change,
    /// or the set already voting on `height`. Needs block `height - 1`
    /// executed.
    pub(crate) async fn expected_next_validator_set(
        &self,
        height: u64,
    ) -> ConsensusResult<ValidatorSet> {
        if height <= 1 {
            return Ok(self.blockchain.initial_validator_set().clone());
        }
        match &self.execution.next_validator_set {
            Some(validator_set) => Ok(validator_set.clone()),
            None => Ok(self.blockchain.validator_set_of(height).await?),
        }
    }

    /// Accept a block decided elsewhere, with the precommits that decided it.
    pub async fn add_reached_block(
        &mut self,
        block: Block,
        consensus: Consensus,
    ) -> ConsensusResult<()> {
        if !self.initialized {
            self.initialize().await?;
        }
        let chain_height = self.blockchain.height().await?;
        let height = block.height();
        if height <= chain_height {
            if self.blockchain.hash_of(height).await? == block.hash() {
                return Ok(());
            }
            return Err(ConsensusError::InvalidBlock {
                height,
                reason: "conflicts with committed block".into(),
            });
        }
        if height != chain_height + 1 {
            return Err(ConsensusError::NonContinuousHeight {
                expected: chain_height + 1,
                actual: height,
            });
        }

        self.catch_up_execution().await?;
        self.validate_block(&block).await?;
        self.verify_commit(&block, &consensus).await?;
        self.commit_block(block, consensus).await
    }

    /// Append a decided block, announce it and move to the next height.
    pub(crate) async fn commit_block(
        &mut self,
        block: Block,
        consensus: Consensus,
    ) -> ConsensusResult<()> {
        let height = block.height();
        let next_validator_set = self.expected_next_validator_set(height).await?;
        self.blockchain
            .append_block(&block, &consensus, &next_validator_set)
            .await?;
        self.pool.update(block.transactions()).await;
        info!(
            "[cc-03] committed block #{} {} ({} txs, round {})",
            height,
            block.hash(),
            block.transactions().len(),
            consensus.vote.round
        );
        self.announce_commit(&block, &consensus).await;
        self.enter_height(height + 1).await
    }

    /// Peers one block behind get the block itself, others just the height.
    async fn announce_commit(&self, block: &Block, consensus: &Consensus) {
        let height = block.height();
        let direct = self.remote_nodes.pick_consensus_receivers(height);
        if !direct.is_empty() {
            self.network
                .broadcast(
                    &direct,
                    Message::NewBlock {
                        block: block.clone(),
                        consensus: consensus.clone(),
                    },
                )
                .await;
        }
        let others: Vec<_> = self
            .remote_nodes
            .pick_block_receivers(height, self.config.block_receiver_exponent)
            .into_iter()
            .filter(|node| !direct.iter().any(|d| d.peer_id == node.peer_id))
            .collect();
        if !others.is_empty() {
            self.network
                .broadcast(&others, Message::NewBlockHeight { height })
                .await;
        }
    }

    async fn enter_height(&mut self, height: u64) -> ConsensusResult<()> {
        let validator_set = self.blockchain.validator_set_of(height).await?;
        let votes = HeightVoteSet::new(height, validator_set, self.blockchain.genesis_hash());
        self.round = Some(RoundState::new(votes));

        let buffered = std::mem::take(&mut self.future_messages);
        for message in buffered {
            if message.height() != height {
                continue;
            }
            if let Err(e) = self.handle_consensus_message(message).await {
                debug!("[cc-03] dropped buffered message for #{}: {}", height, e);
            }
        }
        Ok(())
    }

    /// One unit of progress: execute a committed block, or take one
    /// consensus step on the next height.
    pub async fn proceed_consensus(&mut self) -> ConsensusResult<Progress> {
        self.ensure_initialized()?;
        let chain_height = self.blockchain.height().await?;
        if self.execution.height < chain_height {
            self.execute_block_transactions().await?;
            return Ok(Progress::Advanced);
        }
        if self.round.as_ref().map(|round| round.height) != Some(chain_height + 1) {
            self.enter_height(chain_height + 1).await?;
        }
        self.advance_round().await
    }

    /// Step until nothing changes anymore, initializing on first use.
    pub async fn proceed_consensus_until_steady(&mut self) -> ConsensusResult<()> {
        if !self.initialized {
            self.initialize().await?;
        }
        while self.proceed_consensus().await? == Progress::Advanced {}
        Ok(())
    }
}

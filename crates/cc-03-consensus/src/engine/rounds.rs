//! Round state machine: propose, prevote, precommit, with per-step
//! timeouts and a lock on the last block we precommitted.
//!
//! A proposer holding a locked or polka-backed block proposes it again
//! rather than building a new one. A locked validator prevotes another
//! block only when a polka for it is at least as recent as its lock.

use super::ConsensusEngine;
use crate::domain::{ConsensusError, ConsensusResult, Progress, RoundState, Step};
use crate::ports::{Dapp, TransactionPool};
use cc_01_chain_ledger::KeyValueStore;
use cc_02_remote_nodes::PeerNetwork;
use shared_crypto::{Hash, Signer};
use shared_types::{Block, ConsensusMessage, Message, Proposal, SignedVote, Vote, VoteKind};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

impl<S, D, N, P> ConsensusEngine<S, D, N, P>
where
    S: KeyValueStore,
    D: Dapp,
    N: PeerNetwork,
    P: TransactionPool,
{
    fn state(&self) -> ConsensusResult<&RoundState> {
        self.round.as_ref().ok_or(ConsensusError::NotInitialized)
    }

    fn state_mut(&mut self) -> ConsensusResult<&mut RoundState> {
        self.round.as_mut().ok_or(ConsensusError::NotInitialized)
    }

    /// When the running step times out. `None` while idle.
    pub fn deadline(&self) -> Option<Instant> {
        self.round
            .as_ref()
            .filter(|state| state.active)
            .and_then(|state| state.deadline)
    }

    fn step_deadline(&self, step: Step, round: u32) -> Instant {
        Instant::now() + self.config.timeout(step, round)
    }

    fn enter_step(&mut self, step: Step) -> ConsensusResult<()> {
        let round = self.state()?.round;
        let deadline = self.step_deadline(step, round);
        self.state_mut()?.enter_step(step, deadline);
        Ok(())
    }

    fn next_round(&mut self, round: u32) -> ConsensusResult<()> {
        let deadline = self.step_deadline(Step::Propose, round);
        let state = self.state_mut()?;
        state.enter_round(round, deadline);
        info!("[cc-03] height #{} moving to round {}", state.height, round);
        Ok(())
    }

    fn activate(&mut self) -> ConsensusResult<()> {
        let round = self.state()?.round;
        let deadline = self.step_deadline(Step::Propose, round);
        let state = self.state_mut()?;
        state.active = true;
        state.enter_step(Step::Propose, deadline);
        debug!("[cc-03] starting height #{} round {}", state.height, round);
        Ok(())
    }

    pub(crate) async fn advance_round(&mut self) -> ConsensusResult<Progress> {
        if let Some((round, block)) = self.decided_block()? {
            let consensus = self
                .state()?
                .votes
                .consensus(round, block.hash())
                .ok_or_else(|| ConsensusError::Internal("decision without precommits".into()))?;
            self.commit_block(block, consensus).await?;
            return Ok(Progress::Advanced);
        }

        if !self.state()?.active {
            if !self.has_work().await? {
                return Ok(Progress::Steady);
            }
            self.activate()?;
        }

        let current = self.state()?.round;
        if let Some(round) = self.state()?.votes.round_to_skip_to(current) {
            self.next_round(round)?;
            return Ok(Progress::Advanced);
        }

        match self.state()?.step {
            Step::Propose => self.step_propose().await,
            Step::Prevote => self.step_prevote().await,
            Step::Precommit => self.step_precommit().await,
        }
    }

    /// Block holding a precommit quorum in any round, if we know it.
    fn decided_block(&self) -> ConsensusResult<Option<(u32, Block)>> {
        let state = self.state()?;
        let Some((round, hash)) = state.votes.decision() else {
            return Ok(None);
        };
        if let Some(block) = state.blocks.get(&hash) {
            return Ok(Some((round, block.clone())));
        }
        let genesis = self.blockchain.genesis_block();
        if state.height == 1 && genesis.hash() == hash {
            return Ok(Some((round, genesis.clone())));
        }
        Ok(None)
    }

    fn is_proposer(&self, round: u32) -> ConsensusResult<bool> {
        let state = self.state()?;
        let Some(address) = self.address() else {
            return Ok(false);
        };
        Ok(state
            .votes
            .validator_set()
            .proposer(state.height, round)
            .map(|validator| validator.address == address)
            .unwrap_or(false))
    }

    async fn step_propose(&mut self) -> ConsensusResult<Progress> {
        let (height, round) = {
            let state = self.state()?;
            (state.height, state.round)
        };

        if self.state()?.proposal(round).is_none() {
            if height == 1 {
                // Every node knows genesis; round 0 votes on it directly.
                let genesis = self.blockchain.genesis_block().clone();
                self.state_mut()?.accept_proposal(round, genesis);
            } else if self.is_proposer(round)? {
                self.state_mut()?.update_valid();
                if let Some(block) = self.state()?.valid_block().cloned() {
                    info!(
                        "[cc-03] re-proposing block #{} {} in round {}",
                        height,
                        block.hash(),
                        round
                    );
                    self.propose(round, block).await?;
                } else {
                    match self.construct_block().await? {
                        Some(block) => self.propose(round, block).await?,
                        None => {
                            let state = self.state_mut()?;
                            state.active = false;
                            state.deadline = None;
                            return Ok(Progress::Steady);
                        }
                    }
                }
            }
        }

        let Some(proposal) = self.state()?.proposal(round) else {
            return Ok(Progress::Waiting);
        };
        let prevote = if self.state()?.may_prevote(proposal, round) {
            proposal
        } else {
            Hash::ZERO
        };
        self.cast_vote(VoteKind::Prevote, prevote).await?;
        self.enter_step(Step::Prevote)?;
        Ok(Progress::Advanced)
    }

    async fn step_prevote(&mut self) -> ConsensusResult<Progress> {
        let round = self.state()?.round;
        let Some(hash) = self.state()?.votes.quorum(VoteKind::Prevote, round) else {
            return Ok(Progress::Waiting);
        };

        let state = self.state_mut()?;
        let precommit = if hash.is_zero() {
            state.locked = None;
            Hash::ZERO
        } else if state.blocks.contains_key(&hash) {
            state.locked = Some((round, hash));
            state.valid = Some((round, hash));
            hash
        } else {
            // Quorum for a block we never validated.
            Hash::ZERO
        };
        self.cast_vote(VoteKind::Precommit, precommit).await?;
        self.enter_step(Step::Precommit)?;
        Ok(Progress::Advanced)
    }

    async fn step_precommit(&mut self) -> ConsensusResult<Progress> {
        let round = self.state()?.round;
        match self.state()?.votes.quorum(VoteKind::Precommit, round) {
            Some(hash) if hash.is_zero() => {
                self.next_round(round + 1)?;
                Ok(Progress::Advanced)
            }
            _ => Ok(Progress::Waiting),
        }
    }

    /// Handle an expired step deadline. Early calls are ignored.
    pub async fn on_timeout(&mut self) -> ConsensusResult<()> {
        self.ensure_initialized()?;
        let (height, round, step) = {
            let state = self.state()?;
            match state.deadline {
                Some(deadline) if state.active && Instant::now() >= deadline => {}
                _ => return Ok(()),
            }
            (state.height, state.round, state.step)
        };
        debug!("[cc-03] #{} round {}: {:?} timed out", height, round, step);

        match step {
            Step::Propose => {
                self.cast_vote(VoteKind::Prevote, Hash::ZERO).await?;
                self.enter_step(Step::Prevote)
            }
            Step::Prevote => {
                self.cast_vote(VoteKind::Precommit, Hash::ZERO).await?;
                self.enter_step(Step::Precommit)
            }
            Step::Precommit => self.next_round(round + 1),
        }
    }

    /// Signer, if it belongs to the set voting on this height.
    fn voting_signer(&self) -> ConsensusResult<Option<Arc<dyn Signer>>> {
        let state = self.state()?;
        Ok(self
            .signer
            .as_ref()
            .filter(|signer| state.votes.validator_set().contains(&signer.address()))
            .cloned())
    }

    async fn cast_vote(&mut self, kind: VoteKind, block_hash: Hash) -> ConsensusResult<()> {
        let Some(signer) = self.voting_signer()? else {
            return Ok(());
        };
        let (height, round) = {
            let state = self.state()?;
            (state.height, state.round)
        };
        let signed = SignedVote::sign(
            kind,
            Vote::new(height, round, block_hash),
            &self.blockchain.genesis_hash(),
            signer.as_ref(),
        )
        .map_err(|e| ConsensusError::Internal(format!("signing failed: {}", e)))?;
        self.state_mut()?.votes.add_vote(kind, signed.clone())?;
        debug!(
            "[cc-03] #{} round {}: {:?} for {}",
            height, round, kind, block_hash
        );

        let message = match kind {
            VoteKind::Prevote => ConsensusMessage::Prevote(signed),
            VoteKind::Precommit => ConsensusMessage::Precommit(signed),
        };
        self.network
            .broadcast(
                &self.remote_nodes.nodes(),
                Message::NewConsensusMessage(message),
            )
            .await;
        Ok(())
    }

    async fn propose(&mut self, round: u32, block: Block) -> ConsensusResult<()> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| ConsensusError::Internal("proposer without signer".into()))?;
        let proposal = Proposal::sign(
            round,
            block.clone(),
            &self.blockchain.genesis_hash(),
            signer.as_ref(),
        )
        .map_err(|e| ConsensusError::Internal(format!("signing failed: {}", e)))?;
        info!(
            "[cc-03] proposing block #{} {} in round {} ({} txs)",
            block.height(),
            block.hash(),
            round,
            block.transactions().len()
        );
        self.state_mut()?.accept_proposal(round, block);
        self.network
            .broadcast(
                &self.remote_nodes.nodes(),
                Message::NewConsensusMessage(ConsensusMessage::Proposal(proposal)),
            )
            .await;
        Ok(())
    }

    /// Take a proposal or vote from a peer. Stale heights are ignored and
    /// the next height is buffered.
    pub async fn new_consensus_message(&mut self, message: ConsensusMessage) -> ConsensusResult<()> {
        self.ensure_initialized()?;
        let current = self.state()?.height;
        let height = message.height();
        if height < current {
            return Ok(());
        }
        if height > current {
            if height == current + 1 && self.future_messages.len() < self.config.max_future_messages
            {
                self.future_messages.push(message);
            } else {
                debug!(
                    "[cc-03] dropped {} for #{} while at #{}",
                    message.kind(),
                    height,
                    current
                );
            }
            return Ok(());
        }
        self.handle_consensus_message(message).await
    }

    pub(crate) async fn handle_consensus_message(
        &mut self,
        message: ConsensusMessage,
    ) -> ConsensusResult<()> {
        match message {
            ConsensusMessage::Proposal(proposal) => self.on_proposal(proposal).await?,
            ConsensusMessage::Prevote(vote) => {
                self.state_mut()?.votes.add_vote(VoteKind::Prevote, vote)?;
            }
            ConsensusMessage::Precommit(vote) => {
                self.state_mut()?.votes.add_vote(VoteKind::Precommit, vote)?;
            }
        }
        if !self.state()?.active {
            self.activate()?;
        }
        Ok(())
    }

    async fn on_proposal(&mut self, proposal: Proposal) -> ConsensusResult<()> {
        let height = self.state()?.height;
        if proposal.height() != height || self.state()?.proposal(proposal.round).is_some() {
            return Ok(());
        }
        let signer = proposal.signer(&self.blockchain.genesis_hash())?;
        let expected = self
            .state()?
            .votes
            .validator_set()
            .proposer(height, proposal.round)
            .map(|validator| validator.address)
            .ok_or_else(|| ConsensusError::Internal("empty validator set".into()))?;
        if signer != expected {
            return Err(ConsensusError::InvalidProposer {
                round: proposal.round,
                expected,
                actual: signer,
            });
        }

        self.catch_up_execution().await?;
        self.validate_block(&proposal.block).await?;
        debug!(
            "[cc-03] #{} round {}: accepted proposal {}",
            height,
            proposal.round,
            proposal.block.hash()
        );
        self.state_mut()?.accept_proposal(proposal.round, proposal.block);
        Ok(())
    }
}

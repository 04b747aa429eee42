//! State of the height being agreed on.

use super::vote_set::HeightVoteSet;
use shared_crypto::Hash;
use shared_types::Block;
use std::collections::{BTreeMap, HashMap};
use tokio::time::Instant;

/// Phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Propose,
    Prevote,
    Precommit,
}

/// Outcome of one consensus step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Something changed; step again.
    Advanced,
    /// Blocked on peers or a timeout.
    Waiting,
    /// Nothing to do until new work arrives.
    Steady,
}

#[derive(Debug)]
pub struct RoundState {
    pub height: u64,
    pub round: u32,
    pub step: Step,
    /// A round runs once there is work or a peer started one.
    pub active: bool,
    pub deadline: Option<Instant>,
    /// Validated proposal per round.
    pub proposals: BTreeMap<u32, Hash>,
    /// Every validated block seen at this height.
    pub blocks: HashMap<Hash, Block>,
    /// Round and block of the last prevote quorum we precommitted.
    pub locked: Option<(u32, Hash)>,
    /// Round and block of the latest prevote quorum for a block we hold.
    /// Re-proposed instead of a fresh block.
    pub valid: Option<(u32, Hash)>,
    pub votes: HeightVoteSet,
}

impl RoundState {
    pub fn new(votes: HeightVoteSet) -> Self {
        Self {
            height: votes.height(),
            round: 0,
            step: Step::Propose,
            active: false,
            deadline: None,
            proposals: BTreeMap::new(),
            blocks: HashMap::new(),
            locked: None,
            valid: None,
            votes,
        }
    }

    pub fn accept_proposal(&mut self, round: u32, block: Block) {
        let hash = block.hash();
        self.proposals.insert(round, hash);
        self.blocks.insert(hash, block);
    }

    pub fn proposal(&self, round: u32) -> Option<Hash> {
        self.proposals.get(&round).copied()
    }

    pub fn enter_step(&mut self, step: Step, deadline: Instant) {
        self.step = step;
        self.deadline = Some(deadline);
    }

    pub fn enter_round(&mut self, round: u32, deadline: Instant) {
        self.round = round;
        self.votes.set_round(round);
        self.enter_step(Step::Propose, deadline);
    }

    /// Remember the latest polka up to the current round if we hold its
    /// block.
    pub fn update_valid(&mut self) {
        let Some((round, hash)) = self.votes.latest_polka(self.round) else {
            return;
        };
        let newer = self.valid.map_or(true, |(valid_round, _)| round > valid_round);
        if newer && self.blocks.contains_key(&hash) {
            self.valid = Some((round, hash));
        }
    }

    /// Block to propose again, if a polka or our lock pins one.
    pub fn valid_block(&self) -> Option<&Block> {
        self.valid
            .or(self.locked)
            .and_then(|(_, hash)| self.blocks.get(&hash))
    }

    /// Whether to prevote `proposal` in `round`: unlocked, locked on it, or
    /// a later polka for it overrides the lock.
    pub fn may_prevote(&self, proposal: Hash, round: u32) -> bool {
        match self.locked {
            Some((locked_round, locked)) if locked != proposal => self
                .votes
                .polka_round(proposal, round)
                .map_or(false, |pol_round| pol_round >= locked_round),
            _ => true,
        }
    }
}

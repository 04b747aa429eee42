//! Vote bookkeeping for one height.
//!
//! Votes are keyed by signer per round and phase. A second vote from the
//! same validator for the same round and phase is ignored when identical
//! and rejected when it names another block.
//!
//! Rounds up to one past the current round are always open. Each validator
//! may open at most [`CATCH_UP_ROUNDS`] rounds beyond that; further votes
//! are dropped, so the set stays bounded however many rounds a faulty
//! validator signs.

use super::error::{ConsensusError, ConsensusResult};
use shared_crypto::{Address, Hash};
use shared_types::{Consensus, SignedVote, ValidatorSet, VoteKind};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Rounds past the current one accepted from anyone.
pub const ROUNDS_AHEAD: u32 = 1;

/// Rounds beyond the open window a single validator may start.
pub const CATCH_UP_ROUNDS: usize = 2;

#[derive(Debug, Default)]
struct RoundVotes {
    votes: HashMap<Address, SignedVote>,
    power_by_block: HashMap<Hash, u64>,
    total_power: u64,
}

/// Prevotes and precommits of every round at one height.
#[derive(Debug)]
pub struct HeightVoteSet {
    height: u64,
    genesis_hash: Hash,
    validator_set: ValidatorSet,
    round: u32,
    prevotes: BTreeMap<u32, RoundVotes>,
    precommits: BTreeMap<u32, RoundVotes>,
    catch_up: HashMap<Address, BTreeSet<u32>>,
}

impl HeightVoteSet {
    pub fn new(height: u64, validator_set: ValidatorSet, genesis_hash: Hash) -> Self {
        Self {
            height,
            genesis_hash,
            validator_set,
            round: 0,
            prevotes: BTreeMap::new(),
            precommits: BTreeMap::new(),
            catch_up: HashMap::new(),
        }
    }

    /// Round the holder is in; moves the open window.
    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    /// Rounds holding at least one vote.
    pub fn round_count(&self) -> usize {
        self.prevotes
            .keys()
            .chain(self.precommits.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    fn admits(&mut self, signer: Address, round: u32) -> bool {
        let window = self.round.saturating_add(ROUNDS_AHEAD);
        if round <= window
            || self.prevotes.contains_key(&round)
            || self.precommits.contains_key(&round)
        {
            return true;
        }
        let opened = self.catch_up.entry(signer).or_default();
        if opened.range(window.saturating_add(1)..).count() >= CATCH_UP_ROUNDS {
            return false;
        }
        opened.insert(round);
        true
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    fn rounds(&self, kind: VoteKind) -> &BTreeMap<u32, RoundVotes> {
        match kind {
            VoteKind::Prevote => &self.prevotes,
            VoteKind::Precommit => &self.precommits,
        }
    }

    /// Record a vote. Returns `false` for votes already known, for another
    /// height, or for a round the signer may not open.
    pub fn add_vote(&mut self, kind: VoteKind, signed: SignedVote) -> ConsensusResult<bool> {
        if signed.vote.height != self.height {
            return Ok(false);
        }
        let signer = signed.signer(kind, &self.genesis_hash)?;
        let power = self
            .validator_set
            .power_of(&signer)
            .ok_or(ConsensusError::UnknownValidator(signer))?;

        let round = signed.vote.round;
        if !self.admits(signer, round) {
            return Ok(false);
        }
        let rounds = match kind {
            VoteKind::Prevote => &mut self.prevotes,
            VoteKind::Precommit => &mut self.precommits,
        };
        let votes = rounds.entry(round).or_default();
        if let Some(existing) = votes.votes.get(&signer) {
            if existing.vote.block_hash == signed.vote.block_hash {
                return Ok(false);
            }
            return Err(ConsensusError::ConflictingVote {
                kind,
                validator: signer,
                round,
            });
        }
        *votes
            .power_by_block
            .entry(signed.vote.block_hash)
            .or_default() += power;
        votes.total_power += power;
        votes.votes.insert(signer, signed);
        Ok(true)
    }

    /// Block hash (zero for nil) holding more than 2/3 of the power.
    pub fn quorum(&self, kind: VoteKind, round: u32) -> Option<Hash> {
        let votes = self.rounds(kind).get(&round)?;
        votes
            .power_by_block
            .iter()
            .find(|(_, power)| self.validator_set.is_quorum(**power))
            .map(|(hash, _)| *hash)
    }

    /// More than 2/3 of the power voted, whatever for.
    pub fn has_any_quorum(&self, kind: VoteKind, round: u32) -> bool {
        self.rounds(kind)
            .get(&round)
            .map(|votes| self.validator_set.is_quorum(votes.total_power))
            .unwrap_or(false)
    }

    /// Latest round up to `up_to` with a prevote quorum for a block.
    pub fn latest_polka(&self, up_to: u32) -> Option<(u32, Hash)> {
        self.prevotes.range(..=up_to).rev().find_map(|(round, _)| {
            self.quorum(VoteKind::Prevote, *round)
                .filter(|hash| !hash.is_zero())
                .map(|hash| (*round, hash))
        })
    }

    /// Latest round before `before` with a prevote quorum for `block_hash`.
    pub fn polka_round(&self, block_hash: Hash, before: u32) -> Option<u32> {
        self.prevotes
            .range(..before)
            .rev()
            .map(|(round, _)| *round)
            .find(|round| self.quorum(VoteKind::Prevote, *round) == Some(block_hash))
    }

    /// First round whose precommits commit a block.
    pub fn decision(&self) -> Option<(u32, Hash)> {
        self.precommits.keys().find_map(|round| {
            self.quorum(VoteKind::Precommit, *round)
                .filter(|hash| !hash.is_zero())
                .map(|hash| (*round, hash))
        })
    }

    /// Highest round above `current` in which validators holding more than
    /// 1/3 of the power have voted.
    pub fn round_to_skip_to(&self, current: u32) -> Option<u32> {
        let mut rounds: Vec<u32> = self
            .prevotes
            .keys()
            .chain(self.precommits.keys())
            .copied()
            .filter(|round| *round > current)
            .collect();
        rounds.sort_unstable();
        rounds.dedup();
        rounds.into_iter().rev().find(|round| {
            let signers: HashSet<&Address> = self
                .prevotes
                .get(round)
                .into_iter()
                .chain(self.precommits.get(round))
                .flat_map(|votes| votes.votes.keys())
                .collect();
            let power = signers
                .into_iter()
                .filter_map(|signer| self.validator_set.power_of(signer))
                .sum();
            self.validator_set.is_one_third(power)
        })
    }

    /// Commit record for `block_hash` from the precommits of `round`,
    /// signatures in validator set order.
    pub fn consensus(&self, round: u32, block_hash: Hash) -> Option<Consensus> {
        let votes = self.precommits.get(&round)?;
        let signatures: Vec<_> = self
            .validator_set
            .validators()
            .iter()
            .filter_map(|validator| votes.votes.get(&validator.address))
            .filter(|signed| signed.vote.block_hash == block_hash)
            .map(|signed| signed.signature)
            .collect();
        let first = votes
            .votes
            .values()
            .find(|signed| signed.vote.block_hash == block_hash)?;
        Some(Consensus::new(first.vote, signatures))
    }
}

//! # Consensus Data Model
//!
//! Votes, signed consensus messages and aggregated precommit records.
//!
//! ## Digests
//!
//! Every signed payload is `keccak(tag || genesis_hash || height || round ||
//! block_hash)` with a one byte tag per purpose. The genesis hash acts as the
//! chain id so signatures never replay across chains.

use crate::entities::Block;
use crate::errors::{ValidationError, ValidationResult};
use crate::validator::ValidatorSet;
use serde::{Deserialize, Serialize};
use shared_crypto::{Address, CryptoError, Hash, KeccakHasher, Signature, Signer};
use std::collections::HashSet;

const PREVOTE_TAG: u8 = 0x01;
const PRECOMMIT_TAG: u8 = 0x02;
const PROPOSAL_TAG: u8 = 0x03;

fn signing_digest(tag: u8, genesis_hash: &Hash, height: u64, round: u32, block_hash: &Hash) -> Hash {
    let mut hasher = KeccakHasher::new();
    hasher
        .update([tag])
        .update(genesis_hash)
        .update(height.to_be_bytes())
        .update(round.to_be_bytes())
        .update(block_hash);
    hasher.finalize()
}

/// A vote for a block (or nil) at `(height, round)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vote {
    pub height: u64,
    pub round: u32,
    /// `Hash::ZERO` votes for no block.
    pub block_hash: Hash,
}

impl Vote {
    pub fn new(height: u64, round: u32, block_hash: Hash) -> Self {
        Self {
            height,
            round,
            block_hash,
        }
    }

    /// Abstain vote.
    pub fn nil(height: u64, round: u32) -> Self {
        Self::new(height, round, Hash::ZERO)
    }

    pub fn is_nil(&self) -> bool {
        self.block_hash.is_zero()
    }
}

/// Voting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteKind {
    Prevote,
    Precommit,
}

impl VoteKind {
    /// Phase-separated digest signed by validators.
    pub fn digest(&self, vote: &Vote, genesis_hash: &Hash) -> Hash {
        let tag = match self {
            VoteKind::Prevote => PREVOTE_TAG,
            VoteKind::Precommit => PRECOMMIT_TAG,
        };
        signing_digest(tag, genesis_hash, vote.height, vote.round, &vote.block_hash)
    }
}

/// A vote and its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVote {
    pub vote: Vote,
    pub signature: Signature,
}

impl SignedVote {
    pub fn sign(
        kind: VoteKind,
        vote: Vote,
        genesis_hash: &Hash,
        signer: &dyn Signer,
    ) -> Result<Self, CryptoError> {
        let signature = signer.sign(&kind.digest(&vote, genesis_hash))?;
        Ok(Self { vote, signature })
    }

    pub fn signer(&self, kind: VoteKind, genesis_hash: &Hash) -> Result<Address, CryptoError> {
        self.signature.address(&kind.digest(&self.vote, genesis_hash))
    }
}

/// A proposer's block for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub round: u32,
    pub block: Block,
    pub signature: Signature,
}

impl Proposal {
    pub fn digest(height: u64, round: u32, block_hash: &Hash, genesis_hash: &Hash) -> Hash {
        signing_digest(PROPOSAL_TAG, genesis_hash, height, round, block_hash)
    }

    pub fn sign(
        round: u32,
        block: Block,
        genesis_hash: &Hash,
        signer: &dyn Signer,
    ) -> Result<Self, CryptoError> {
        let digest = Self::digest(block.height(), round, &block.hash(), genesis_hash);
        let signature = signer.sign(&digest)?;
        Ok(Self {
            round,
            block,
            signature,
        })
    }

    pub fn height(&self) -> u64 {
        self.block.height()
    }

    pub fn signer(&self, genesis_hash: &Hash) -> Result<Address, CryptoError> {
        let digest = Self::digest(self.height(), self.round, &self.block.hash(), genesis_hash);
        self.signature.address(&digest)
    }
}

/// Messages exchanged while agreeing on a height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusMessage {
    Proposal(Proposal),
    Prevote(SignedVote),
    Precommit(SignedVote),
}

impl ConsensusMessage {
    pub fn height(&self) -> u64 {
        match self {
            ConsensusMessage::Proposal(proposal) => proposal.height(),
            ConsensusMessage::Prevote(signed) | ConsensusMessage::Precommit(signed) => {
                signed.vote.height
            }
        }
    }

    pub fn round(&self) -> u32 {
        match self {
            ConsensusMessage::Proposal(proposal) => proposal.round,
            ConsensusMessage::Prevote(signed) | ConsensusMessage::Precommit(signed) => {
                signed.vote.round
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConsensusMessage::Proposal(_) => "proposal",
            ConsensusMessage::Prevote(_) => "prevote",
            ConsensusMessage::Precommit(_) => "precommit",
        }
    }
}

/// A block hash with the precommit signatures of a quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    pub vote: Vote,
    pub signatures: Vec<Signature>,
}

impl Consensus {
    pub fn new(vote: Vote, signatures: Vec<Signature>) -> Self {
        Self { vote, signatures }
    }

    /// Content hash, referenced by the next header's `last_consensus_hash`.
    pub fn hash(&self) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher
            .update(self.vote.height.to_be_bytes())
            .update(self.vote.round.to_be_bytes())
            .update(self.vote.block_hash);
        for signature in &self.signatures {
            hasher.update(signature.as_bytes());
        }
        hasher.finalize()
    }

    /// Verify every precommit signature against `validator_set` and require
    /// strictly more than 2/3 of its power. Returns the signed power.
    pub fn verify(&self, validator_set: &ValidatorSet, genesis_hash: &Hash) -> ValidationResult<u64> {
        let digest = VoteKind::Precommit.digest(&self.vote, genesis_hash);
        let mut signers = HashSet::with_capacity(self.signatures.len());
        let mut power = 0u64;

        for signature in &self.signatures {
            let address = signature.address(&digest)?;
            if !signers.insert(address) {
                return Err(ValidationError::DuplicateSigner(address));
            }
            power += validator_set
                .power_of(&address)
                .ok_or(ValidationError::UnknownValidator(address))?;
        }

        if !validator_set.is_quorum(power) {
            return Err(ValidationError::InsufficientQuorum {
                power,
                total: validator_set.total_power(),
            });
        }
        Ok(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;
    use shared_crypto::KeyPair;

    fn genesis() -> Hash {
        Hash::from_data("genesis")
    }

    fn validators(keys: &[KeyPair]) -> ValidatorSet {
        ValidatorSet::new(keys.iter().map(|k| Validator::new(k.address(), 100)).collect()).unwrap()
    }

    fn precommits(keys: &[KeyPair], vote: &Vote) -> Vec<Signature> {
        let digest = VoteKind::Precommit.digest(vote, &genesis());
        keys.iter().map(|k| k.sign(&digest).unwrap()).collect()
    }

    #[test]
    fn test_digests_are_domain_separated() {
        let vote = Vote::new(5, 1, Hash::from_data("block"));
        let prevote = VoteKind::Prevote.digest(&vote, &genesis());
        let precommit = VoteKind::Precommit.digest(&vote, &genesis());
        let proposal = Proposal::digest(5, 1, &vote.block_hash, &genesis());

        assert_ne!(prevote, precommit);
        assert_ne!(prevote, proposal);
        assert_ne!(precommit, proposal);
        assert_ne!(
            precommit,
            VoteKind::Precommit.digest(&vote, &Hash::from_data("other chain"))
        );
    }

    #[test]
    fn test_signed_vote_recovers_signer() {
        let key = KeyPair::generate();
        let vote = Vote::new(2, 0, Hash::from_data("block"));
        let signed = SignedVote::sign(VoteKind::Prevote, vote, &genesis(), &key).unwrap();

        assert_eq!(signed.signer(VoteKind::Prevote, &genesis()).unwrap(), key.address());
        assert_ne!(
            signed.signer(VoteKind::Precommit, &genesis()).ok(),
            Some(key.address())
        );
    }

    #[test]
    fn test_consensus_quorum() {
        let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
        let set = validators(&keys);
        let vote = Vote::new(3, 0, Hash::from_data("block"));

        let full = Consensus::new(vote, precommits(&keys[..3], &vote));
        assert_eq!(full.verify(&set, &genesis()), Ok(300));

        let partial = Consensus::new(vote, precommits(&keys[..2], &vote));
        assert_eq!(
            partial.verify(&set, &genesis()),
            Err(ValidationError::InsufficientQuorum {
                power: 200,
                total: 400
            })
        );
    }

    #[test]
    fn test_consensus_rejects_duplicates_and_strangers() {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let set = validators(&keys);
        let vote = Vote::new(3, 0, Hash::from_data("block"));

        let mut signatures = precommits(&keys, &vote);
        signatures.push(signatures[0]);
        assert_eq!(
            Consensus::new(vote, signatures).verify(&set, &genesis()),
            Err(ValidationError::DuplicateSigner(keys[0].address()))
        );

        let stranger = KeyPair::generate();
        let signatures = precommits(&[keys[0].clone(), stranger.clone()], &vote);
        assert_eq!(
            Consensus::new(vote, signatures).verify(&set, &genesis()),
            Err(ValidationError::UnknownValidator(stranger.address()))
        );
    }

    #[test]
    fn test_prevote_signatures_do_not_count_as_precommits() {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let set = validators(&keys);
        let vote = Vote::new(3, 0, Hash::from_data("block"));
        let digest = VoteKind::Prevote.digest(&vote, &genesis());
        let signatures = keys.iter().map(|k| k.sign(&digest).unwrap()).collect();

        assert!(Consensus::new(vote, signatures).verify(&set, &genesis()).is_err());
    }

    #[test]
    fn test_nil_vote() {
        assert!(Vote::nil(1, 2).is_nil());
        assert!(!Vote::new(1, 2, Hash::from_data("x")).is_nil());
    }
}

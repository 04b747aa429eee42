//! # Validators
//!
//! An ordered, weighted validator set. Order matters: it feeds the set root
//! and proposer rotation.

use crate::errors::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use shared_crypto::{merkle_root, Address, Hash, Hashable, KeccakHasher};
use std::collections::HashSet;

/// A validator and its voting power.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    pub voting_power: u64,
}

impl Validator {
    pub fn new(address: Address, voting_power: u64) -> Self {
        Self {
            address,
            voting_power,
        }
    }
}

impl Hashable for Validator {
    fn hash(&self) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher
            .update(self.address.as_bytes())
            .update(self.voting_power.to_be_bytes());
        hasher.finalize()
    }
}

/// Ordered set of validators. Decoding goes through [`ValidatorSet::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Validator>", into = "Vec<Validator>")]
pub struct ValidatorSet {
    validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Build a set, rejecting empty sets, zero power, duplicates and a
    /// total power beyond `u64::MAX`.
    pub fn new(validators: Vec<Validator>) -> ValidationResult<Self> {
        if validators.is_empty() {
            return Err(ValidationError::EmptyValidatorSet);
        }
        let mut seen = HashSet::with_capacity(validators.len());
        let mut total: u64 = 0;
        for validator in &validators {
            if validator.voting_power == 0 {
                return Err(ValidationError::ZeroVotingPower(validator.address));
            }
            if !seen.insert(validator.address) {
                return Err(ValidationError::DuplicateValidator(validator.address));
            }
            total = total
                .checked_add(validator.voting_power)
                .ok_or(ValidationError::VotingPowerOverflow)?;
        }
        Ok(Self { validators })
    }

    /// Content hash, referenced by `next_validator_set_root`.
    pub fn root(&self) -> Hash {
        merkle_root(&self.validators)
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Sum of all voting power. Fits in a `u64` for every constructed set.
    pub fn total_power(&self) -> u64 {
        self.validators
            .iter()
            .fold(0u64, |total, v| total.saturating_add(v.voting_power))
    }

    /// Voting power of `address`, `None` if not a member.
    pub fn power_of(&self, address: &Address) -> Option<u64> {
        self.validators
            .iter()
            .find(|v| &v.address == address)
            .map(|v| v.voting_power)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.power_of(address).is_some()
    }

    /// Round-robin proposer for `(height, round)`.
    pub fn proposer(&self, height: u64, round: u32) -> Option<&Validator> {
        if self.validators.is_empty() {
            return None;
        }
        let index = (height.wrapping_add(u64::from(round))) % self.validators.len() as u64;
        self.validators.get(index as usize)
    }

    /// Strictly more than 2/3 of total power.
    pub fn is_quorum(&self, power: u64) -> bool {
        u128::from(power) * 3 > u128::from(self.total_power()) * 2
    }

    /// Strictly more than 1/3 of total power; at least one honest member.
    pub fn is_one_third(&self, power: u64) -> bool {
        u128::from(power) * 3 > u128::from(self.total_power())
    }
}

impl TryFrom<Vec<Validator>> for ValidatorSet {
    type Error = ValidationError;

    fn try_from(validators: Vec<Validator>) -> ValidationResult<Self> {
        Self::new(validators)
    }
}

impl From<ValidatorSet> for Vec<Validator> {
    fn from(set: ValidatorSet) -> Self {
        set.validators
    }
}

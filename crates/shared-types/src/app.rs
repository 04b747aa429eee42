//! Application state reported by the Dapp.

use crate::ValidatorSet;
use serde::{Deserialize, Serialize};
use shared_crypto::Hash;

/// State of the application after the last executed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Height of the last executed block (0 before genesis).
    pub height: u64,
    /// Application state root after that block.
    pub hash: Hash,
    /// Validator set the application wants in force from the next-next block.
    pub next_validator_set: Option<ValidatorSet>,
}

impl AppState {
    /// State without a validator set change.
    pub fn new(height: u64, hash: Hash) -> Self {
        Self {
            height,
            hash,
            next_validator_set: None,
        }
    }

    /// Announce a validator set change.
    pub fn with_next_validator_set(mut self, validator_set: ValidatorSet) -> Self {
        self.next_validator_set = Some(validator_set);
        self
    }
}

//! # Genesis Block Builder
//!
//! Creates the genesis block and initial validator set for a chain.

use shared_crypto::{CryptoError, Hash, KeyPair};
use shared_types::{Block, Consensus, ValidationError, Validator, ValidatorSet, Vote};
use thiserror::Error;

/// Voting power each devnet validator gets.
pub const DEVNET_VOTING_POWER: u64 = 10;

/// Genesis block creation errors.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// Invalid genesis configuration.
    #[error("invalid genesis configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid initial validator set: {0}")]
    InvalidValidatorSet(#[from] ValidationError),

    #[error("devnet key derivation failed: {0}")]
    Key(#[from] CryptoError),
}

/// Genesis block configuration.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// Chain-unique seed; its hash becomes the genesis `last_block_hash`.
    pub unique: String,
    /// Genesis timestamp (unix milliseconds).
    pub timestamp: u64,
    /// Initial validator set, in proposer order.
    pub validators: Vec<Validator>,
    /// Application state the chain starts from.
    pub app_state_hash: Hash,
}

impl GenesisConfig {
    /// Equal-power validators for `keys`, starting from `app_state_hash`.
    pub fn devnet(keys: &[KeyPair], app_state_hash: Hash) -> Self {
        Self {
            unique: "concord devnet".to_string(),
            timestamp: 1_700_000_000_000,
            validators: keys
                .iter()
                .map(|key| Validator::new(key.address(), DEVNET_VOTING_POWER))
                .collect(),
            app_state_hash,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.unique.is_empty() {
            return Err(GenesisError::InvalidConfig(
                "unique seed must not be empty".to_string(),
            ));
        }
        if self.validators.is_empty() {
            return Err(GenesisError::InvalidConfig(
                "at least one validator is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for the genesis block.
pub struct GenesisBuilder {
    config: GenesisConfig,
}

impl GenesisBuilder {
    pub fn new(config: GenesisConfig) -> Self {
        Self { config }
    }

    /// Build the genesis block and the validator set it announces.
    pub fn build(&self) -> Result<(Block, ValidatorSet), GenesisError> {
        self.config.validate()?;
        let validator_set = ValidatorSet::new(self.config.validators.clone())?;
        let seed = Hash::from_data(self.config.unique.as_bytes());
        let genesis = Block::construct(
            1,
            self.config.timestamp,
            seed,
            validator_set.root(),
            self.config.app_state_hash,
            vec![],
            Consensus::new(Vote::new(0, 1, seed), vec![]),
        );
        tracing::info!(
            "Genesis block built: hash={}, validators={}",
            genesis.hash(),
            validator_set.len()
        );
        Ok((genesis, validator_set))
    }
}

/// Deterministic validator keys for devnets. Never use them elsewhere.
pub fn devnet_keys(count: usize) -> Result<Vec<KeyPair>, GenesisError> {
    (0..count)
        .map(|i| {
            let secret = Hash::from_data(format!("concord devnet validator {}", i));
            Ok(KeyPair::from_secret(*secret.as_bytes())?)
        })
        .collect()
}

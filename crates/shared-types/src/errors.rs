//! # Error Types
//!
//! Structural validation failures of shared records.

use shared_crypto::{Address, CryptoError};
use thiserror::Error;

/// Result alias for record validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A record is malformed or not backed by enough voting power.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Signature could not be recovered.
    #[error("Invalid signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    /// Signer is not part of the validator set in force.
    #[error("Unknown validator: {0}")]
    UnknownValidator(Address),

    /// Same validator signed twice.
    #[error("Duplicate signer: {0}")]
    DuplicateSigner(Address),

    /// Signed power does not exceed 2/3 of the total.
    #[error("Insufficient quorum: {power} of {total} voting power")]
    InsufficientQuorum { power: u64, total: u64 },

    /// Validator set without members.
    #[error("Validator set is empty")]
    EmptyValidatorSet,

    /// Validator with zero voting power.
    #[error("Validator {0} has zero voting power")]
    ZeroVotingPower(Address),

    /// Summed voting power does not fit in a `u64`.
    #[error("Total voting power overflows")]
    VotingPowerOverflow,

    /// Validator listed twice.
    #[error("Validator {0} listed twice")]
    DuplicateValidator(Address),

    /// Header does not commit to the body's transactions.
    #[error("Transactions root mismatch")]
    TransactionsRootMismatch,

    /// Header does not commit to the body's consensus record.
    #[error("Last consensus hash mismatch")]
    ConsensusHashMismatch,
}

//! # Domain Errors
//!
//! Error types for the Chain Ledger subsystem.

use shared_types::Hash;
use thiserror::Error;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Accessor used before `ready()`.
    #[error("Blockchain is not ready")]
    NotReady,

    /// No header stored at this height.
    #[error("Header not found at height {height}")]
    HeaderNotFound { height: u64 },

    /// No body stored at this height.
    #[error("Body not found at height {height}")]
    BodyNotFound { height: u64 },

    /// Header points at a validator set that was never stored.
    #[error("Validator set not found: {root}")]
    ValidatorSetNotFound { root: Hash },

    /// No consensus record for this height.
    #[error("Consensus not found at height {height}")]
    ConsensusNotFound { height: u64 },

    /// Store belongs to another chain. Operator must wipe the data directory.
    #[error("Stored genesis block is invalid. You need to reset store.")]
    InvalidGenesis,

    /// Configured genesis header does not point at the configured validator set.
    #[error("Genesis header does not announce the initial validator set")]
    GenesisValidatorSetMismatch,

    /// Append that does not extend the tip by exactly one.
    #[error("Non-sequential height: expected {expected}, got {actual}")]
    NonSequentialHeight { expected: u64, actual: u64 },

    /// Appended block does not link to the stored tip.
    #[error("Block at height {height} does not extend the stored tip")]
    ParentMismatch { height: u64 },

    /// Supplied validator set is not the one the header announces.
    #[error("Validator set does not match the root announced at height {height}")]
    ValidatorSetMismatch { height: u64 },

    /// Supplied consensus is not for the appended block.
    #[error("Consensus does not commit block at height {height}")]
    ConsensusMismatch { height: u64 },

    /// Underlying key-value store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] KvStoreError),

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {0}")]
    Io(String),

    /// Data corruption in the store.
    #[error("KV store corruption: {0}")]
    Corruption(String),
}

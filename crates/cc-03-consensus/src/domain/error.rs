//! Error types for the Consensus subsystem

use cc_01_chain_ledger::LedgerError;
use shared_crypto::{Address, CryptoError};
use shared_types::{ValidationError, VoteKind};

/// How an error must be handled by the node loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Operator must intervene (reset data). Fatal at startup.
    Configuration,
    /// A peer sent something invalid. Reject it and carry on.
    Protocol,
    /// Contract violation inside the node. Fatal for the operation.
    Internal,
    /// I/O hiccup. Drop the peer and carry on.
    Transient,
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// Consensus error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    #[error("not initialized")]
    NotInitialized,

    #[error("need reset app: app height {app_height} is ahead of chain height {chain_height}")]
    NeedResetApp { app_height: u64, chain_height: u64 },

    #[error("all blocks executed up to #{height}")]
    AllBlocksExecuted { height: u64 },

    #[error("block #{height} is not executed yet (app height {app_height})")]
    NotExecuted { height: u64, app_height: u64 },

    #[error("block height mismatch: expected {expected}, app reported {actual}")]
    BlockHeightMismatch { expected: u64, actual: u64 },

    #[error("invalid block #{height}: {reason}")]
    InvalidBlock { height: u64, reason: String },

    #[error("non-continuous height: expected {expected}, got {actual}")]
    NonContinuousHeight { expected: u64, actual: u64 },

    #[error("invalid consensus: {0}")]
    InvalidConsensus(#[from] ValidationError),

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] CryptoError),

    #[error("unknown validator: {0}")]
    UnknownValidator(Address),

    #[error("conflicting {kind:?} from {validator} in round {round}")]
    ConflictingVote {
        kind: VoteKind,
        validator: Address,
        round: u32,
    },

    #[error("invalid proposer {actual} for round {round}, expected {expected}")]
    InvalidProposer {
        round: u32,
        expected: Address,
        actual: Address,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("dapp error: {0}")]
    Dapp(String),

    #[error("transaction pool error: {0}")]
    Pool(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConsensusError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ConsensusError::NeedResetApp { .. }
            | ConsensusError::Ledger(LedgerError::InvalidGenesis)
            | ConsensusError::Ledger(LedgerError::GenesisValidatorSetMismatch) => {
                ErrorClass::Configuration
            }
            ConsensusError::InvalidBlock { .. }
            | ConsensusError::NonContinuousHeight { .. }
            | ConsensusError::InvalidConsensus(_)
            | ConsensusError::InvalidSignature(_)
            | ConsensusError::UnknownValidator(_)
            | ConsensusError::ConflictingVote { .. }
            | ConsensusError::InvalidProposer { .. }
            | ConsensusError::Pool(_) => ErrorClass::Protocol,
            ConsensusError::NotInitialized
            | ConsensusError::AllBlocksExecuted { .. }
            | ConsensusError::NotExecuted { .. }
            | ConsensusError::BlockHeightMismatch { .. }
            | ConsensusError::Ledger(_)
            | ConsensusError::Dapp(_)
            | ConsensusError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Rejected item, node keeps running.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.class(), ErrorClass::Protocol | ErrorClass::Transient)
    }
}

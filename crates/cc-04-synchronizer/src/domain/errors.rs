//! # Synchronizer Errors

use cc_01_chain_ledger::LedgerError;
use cc_02_remote_nodes::{PeerError, PeerId};
use cc_03_consensus::ConsensusError;
use thiserror::Error;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("request to {0} timed out")]
    Timeout(PeerId),

    #[error("unexpected response from {peer}: {detail}")]
    UnexpectedResponse { peer: PeerId, detail: String },

    #[error("invalid header chain: {0}")]
    InvalidHeaderChain(String),

    #[error("block #{height} from {peer} rejected: {source}")]
    Rejected {
        peer: PeerId,
        height: u64,
        source: ConsensusError,
    },

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl SyncError {
    /// The provider misbehaved or vanished; drop it and try another.
    pub fn is_peer_fault(&self) -> bool {
        match self {
            SyncError::Peer(_)
            | SyncError::Timeout(_)
            | SyncError::UnexpectedResponse { .. }
            | SyncError::InvalidHeaderChain(_) => true,
            SyncError::Rejected { source, .. } => source.is_recoverable(),
            SyncError::Consensus(_) | SyncError::Ledger(_) => false,
        }
    }

    /// Local failure that sync cannot route around.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Rejected { source, .. } | SyncError::Consensus(source) => {
                !source.is_recoverable()
            }
            SyncError::Ledger(_) => true,
            _ => false,
        }
    }
}

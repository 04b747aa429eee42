//! Node-level errors, aggregating every subsystem's.

use crate::container::ConfigError;
use crate::genesis::GenesisError;
use cc_01_chain_ledger::LedgerError;
use cc_02_remote_nodes::{PeerError, PeerId};
use cc_03_consensus::ConsensusError;
use cc_04_synchronizer::SyncError;
use thiserror::Error;

pub type NodeResult<T> = Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("[cc-01] {0}")]
    Ledger(#[from] LedgerError),

    #[error("[cc-02] {0}")]
    Peer(#[from] PeerError),

    #[error("[cc-03] {0}")]
    Consensus(#[from] ConsensusError),

    #[error("[cc-04] {0}")]
    Sync(#[from] SyncError),

    #[error("handshake with {peer} failed: {reason}")]
    Handshake { peer: PeerId, reason: String },

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("genesis: {0}")]
    Genesis(#[from] GenesisError),

    #[error("node already started")]
    AlreadyStarted,
}

impl NodeError {
    /// The node can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            NodeError::Consensus(e) => e.is_recoverable(),
            NodeError::Sync(e) => !e.is_fatal(),
            NodeError::Peer(_) | NodeError::Handshake { .. } => true,
            _ => false,
        }
    }
}

//! Peer transport errors.

use super::peer::PeerId;
use thiserror::Error;

/// Failures talking to a peer. All of them are transient from the node's
/// point of view: the peer is dropped and selection routes around it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("Peer disconnected: {0}")]
    Disconnected(PeerId),

    #[error("Request to {0} timed out")]
    Timeout(PeerId),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

//! # Outbound Ports
//!
//! The peer transport. Discovery, encryption and framing live behind it;
//! the core only sends messages, issues requests and drops peers.

use crate::domain::errors::PeerError;
use crate::domain::peer::PeerId;
use crate::domain::remote_node::RemoteNode;
use async_trait::async_trait;
use shared_types::{Message, Request, Response};
use std::sync::Arc;

/// Peer network interface for P2P communication.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Send a one-way message.
    async fn send(&self, peer: &PeerId, message: Message) -> Result<(), PeerError>;

    /// Issue a request and wait for its response.
    async fn request(&self, peer: &PeerId, request: Request) -> Result<Response, PeerError>;

    /// Disconnect a peer.
    async fn drop_peer(&self, peer: &PeerId);

    /// Send `message` to each of `peers`.
    async fn broadcast(
        &self,
        peers: &[Arc<RemoteNode>],
        message: Message,
    ) -> Vec<Result<(), PeerError>> {
        let mut results = Vec::with_capacity(peers.len());
        for node in peers {
            let result = self.send(&node.peer_id, message.clone()).await;
            if let Err(e) = &result {
                tracing::debug!("[cc-02] {} to {} failed: {}", message.kind(), node.peer_id, e);
            }
            results.push(result);
        }
        results
    }
}

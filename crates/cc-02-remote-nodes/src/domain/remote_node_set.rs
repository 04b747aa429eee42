//! The set of connected peers and the selection policies over it.

use super::peer::PeerId;
use super::remote_node::RemoteNode;
use super::sampling::{fan_out, sample};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Connected peers in connection order.
#[derive(Debug, Default)]
pub struct RemoteNodeSet {
    nodes: RwLock<Vec<Arc<RemoteNode>>>,
}

impl RemoteNodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. A peer id already present keeps its existing entry.
    pub fn add(&self, node: RemoteNode) -> Arc<RemoteNode> {
        let mut nodes = self.nodes.write();
        if let Some(existing) = nodes.iter().find(|n| n.peer_id == node.peer_id) {
            return Arc::clone(existing);
        }
        let node = Arc::new(node);
        nodes.push(Arc::clone(&node));
        node
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<Arc<RemoteNode>> {
        self.nodes
            .read()
            .iter()
            .find(|n| &n.peer_id == peer_id)
            .cloned()
    }

    pub fn delete(&self, peer_id: &PeerId) -> Option<Arc<RemoteNode>> {
        let mut nodes = self.nodes.write();
        let index = nodes.iter().position(|n| &n.peer_id == peer_id)?;
        Some(nodes.remove(index))
    }

    /// Snapshot in connection order.
    pub fn nodes(&self) -> Vec<Arc<RemoteNode>> {
        self.nodes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    fn filtered(&self, keep: impl Fn(&RemoteNode) -> bool) -> Vec<Arc<RemoteNode>> {
        self.nodes
            .read()
            .iter()
            .filter(|n| keep(n))
            .cloned()
            .collect()
    }

    /// Peer with the greatest reported height; the earliest connected wins
    /// ties.
    pub fn best_node(&self) -> Option<Arc<RemoteNode>> {
        self.nodes
            .read()
            .iter()
            .cloned()
            .reduce(|best, node| {
                if node.height() > best.height() {
                    node
                } else {
                    best
                }
            })
    }

    /// Random peer known to have `height`.
    pub fn pick_provider(&self, height: u64) -> Option<Arc<RemoteNode>> {
        self.filtered(|n| n.height() >= height)
            .choose(&mut rand::thread_rng())
            .cloned()
    }

    /// Random peer known to have `height` that is not serving a request.
    pub fn pick_idle_provider(&self, height: u64) -> Option<Arc<RemoteNode>> {
        self.filtered(|n| n.height() >= height && n.is_idle())
            .choose(&mut rand::thread_rng())
            .cloned()
    }

    /// `floor(n ^ exponent)` random peers.
    pub fn pick_transaction_receivers(&self, exponent: f64) -> Vec<Arc<RemoteNode>> {
        let candidates = self.nodes();
        sample(&candidates, fan_out(candidates.len(), exponent))
    }

    /// `floor(n ^ exponent)` random peers among those below `known_height`.
    pub fn pick_block_receivers(&self, known_height: u64, exponent: f64) -> Vec<Arc<RemoteNode>> {
        let candidates = self.filtered(|n| n.height() < known_height);
        sample(&candidates, fan_out(candidates.len(), exponent))
    }

    /// Peers exactly one block behind `consensus_height`; they can apply the
    /// committed block directly.
    pub fn pick_consensus_receivers(&self, consensus_height: u64) -> Vec<Arc<RemoteNode>> {
        match consensus_height.checked_sub(1) {
            Some(height) => self.filtered(|n| n.height() == height),
            None => Vec::new(),
        }
    }
}

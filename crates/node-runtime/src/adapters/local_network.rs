//! # In-Process Network
//!
//! `LocalHub` links nodes living in one process; each node talks through
//! its own `LocalNetwork`, an implementation of the `PeerNetwork` port.
//! Used by the binary's devnet mode and by integration tests.
//!
//! Messages are delivered on a spawned task, so a sender never waits on
//! the receiver's locks. Requests are answered inline.

use async_trait::async_trait;
use cc_02_remote_nodes::{PeerError, PeerId, PeerNetwork};
use parking_lot::RwLock;
use shared_types::{Message, Request, Response};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Inbound side of a node attached to a hub.
#[async_trait]
pub trait PeerHandler: Send + Sync {
    /// A link to `peer` came up.
    async fn on_connect(&self, peer: PeerId);

    async fn on_message(&self, from: PeerId, message: Message);

    async fn on_request(&self, from: PeerId, request: Request) -> Result<Response, PeerError>;

    /// The link to `peer` went down.
    async fn on_disconnect(&self, peer: PeerId);
}

/// Registry of in-process nodes and the links between them.
///
/// Handlers are held weakly; a dropped node just stops answering.
#[derive(Default)]
pub struct LocalHub {
    handlers: RwLock<HashMap<PeerId, Weak<dyn PeerHandler>>>,
    links: RwLock<HashSet<(PeerId, PeerId)>>,
}

impl LocalHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Network endpoint for `peer_id`.
    pub fn network(self: &Arc<Self>, peer_id: PeerId) -> LocalNetwork {
        LocalNetwork {
            hub: self.clone(),
            local: peer_id,
        }
    }

    /// Attach `handler` as `peer_id`.
    pub fn register<H>(&self, peer_id: PeerId, handler: &Arc<H>)
    where
        H: PeerHandler + 'static,
    {
        let handler: Arc<dyn PeerHandler> = handler.clone();
        self.handlers
            .write()
            .insert(peer_id, Arc::downgrade(&handler));
    }

    fn handler(&self, peer_id: &PeerId) -> Option<Arc<dyn PeerHandler>> {
        self.handlers.read().get(peer_id).and_then(Weak::upgrade)
    }

    pub fn is_linked(&self, a: &PeerId, b: &PeerId) -> bool {
        self.links.read().contains(&(a.clone(), b.clone()))
    }

    /// Peers linked to `peer_id`.
    pub fn links_of(&self, peer_id: &PeerId) -> Vec<PeerId> {
        self.links
            .read()
            .iter()
            .filter(|(from, _)| from == peer_id)
            .map(|(_, to)| to.clone())
            .collect()
    }

    /// Link `a` and `b` and let both sides start their handshake.
    pub fn connect(&self, a: &PeerId, b: &PeerId) -> Result<(), PeerError> {
        let handler_a = self
            .handler(a)
            .ok_or_else(|| PeerError::UnknownPeer(a.clone()))?;
        let handler_b = self
            .handler(b)
            .ok_or_else(|| PeerError::UnknownPeer(b.clone()))?;
        {
            let mut links = self.links.write();
            if !links.insert((a.clone(), b.clone())) {
                return Ok(());
            }
            links.insert((b.clone(), a.clone()));
        }
        debug!("link {} <-> {}", a, b);
        let (peer_a, peer_b) = (a.clone(), b.clone());
        tokio::spawn(async move { handler_a.on_connect(peer_b).await });
        tokio::spawn(async move { handler_b.on_connect(peer_a).await });
        Ok(())
    }

    /// Link every pair of `peers`.
    pub fn connect_all(&self, peers: &[PeerId]) -> Result<(), PeerError> {
        for (i, a) in peers.iter().enumerate() {
            for b in &peers[i + 1..] {
                self.connect(a, b)?;
            }
        }
        Ok(())
    }

    /// Cut the link between `a` and `b`, telling both sides.
    pub fn disconnect(&self, a: &PeerId, b: &PeerId) {
        let removed = {
            let mut links = self.links.write();
            let removed = links.remove(&(a.clone(), b.clone()));
            links.remove(&(b.clone(), a.clone()));
            removed
        };
        if !removed {
            return;
        }
        debug!("unlink {} <-> {}", a, b);
        for (side, other) in [(a, b), (b, a)] {
            if let Some(handler) = self.handler(side) {
                let other = other.clone();
                tokio::spawn(async move { handler.on_disconnect(other).await });
            }
        }
    }

    /// Cut every link of `peer_id`.
    pub fn isolate(&self, peer_id: &PeerId) {
        for other in self.links_of(peer_id) {
            self.disconnect(peer_id, &other);
        }
    }
}

/// One node's endpoint on a `LocalHub`.
#[derive(Clone)]
pub struct LocalNetwork {
    hub: Arc<LocalHub>,
    local: PeerId,
}

impl LocalNetwork {
    pub fn local_peer(&self) -> &PeerId {
        &self.local
    }

    fn linked_handler(&self, peer: &PeerId) -> Result<Arc<dyn PeerHandler>, PeerError> {
        if !self.hub.is_linked(&self.local, peer) {
            return Err(PeerError::Disconnected(peer.clone()));
        }
        self.hub
            .handler(peer)
            .ok_or_else(|| PeerError::Disconnected(peer.clone()))
    }
}

#[async_trait]
impl PeerNetwork for LocalNetwork {
    async fn send(&self, peer: &PeerId, message: Message) -> Result<(), PeerError> {
        let handler = self.linked_handler(peer)?;
        let from = self.local.clone();
        tokio::spawn(async move { handler.on_message(from, message).await });
        Ok(())
    }

    async fn request(&self, peer: &PeerId, request: Request) -> Result<Response, PeerError> {
        let handler = self.linked_handler(peer)?;
        handler.on_request(self.local.clone(), request).await
    }

    async fn drop_peer(&self, peer: &PeerId) {
        self.hub.disconnect(&self.local, peer);
    }
}

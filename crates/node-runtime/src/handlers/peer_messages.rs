//! Handshake and dispatch of peer traffic.
//!
//! A new link is only trusted after the peer's `Hello` names our genesis.
//! Until then its messages and requests are ignored, and a peer that stays
//! silent past the handshake timeout is dropped.

use crate::adapters::PeerHandler;
use crate::errors::NodeError;
use crate::wiring::ChainCore;
use async_trait::async_trait;
use cc_01_chain_ledger::KeyValueStore;
use cc_02_remote_nodes::{PeerError, PeerId, PeerNetwork};
use cc_03_consensus::Dapp;
use shared_types::{Message, Request, Response};
use tracing::{debug, info, warn};

impl<S, D, N> ChainCore<S, D, N>
where
    S: KeyValueStore + 'static,
    D: Dapp + 'static,
    N: PeerNetwork + 'static,
{
    async fn tip(&self) -> Result<u64, NodeError> {
        self.blockchain.ready().await?;
        Ok(self.blockchain.height().await?)
    }

    /// Greet `peer` and drop it unless it greets back in time.
    async fn handshake(&self, peer: PeerId) {
        debug!("handshake with {}", peer);
        let hello = match self.tip().await {
            Ok(height) => Message::Hello {
                height,
                genesis_hash: self.blockchain.genesis_hash(),
            },
            Err(e) => {
                self.report(e);
                return;
            }
        };
        if let Err(e) = self.network.send(&peer, hello).await {
            debug!("hello to {} failed: {}", peer, e);
            return;
        }

        let timeout = self.config.network.handshake_timeout;
        let remote_nodes = self.remote_nodes.clone();
        let network = self.network.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if remote_nodes.get(&peer).is_none() {
                info!("handshake timeout {}", peer);
                network.drop_peer(&peer).await;
            }
        });
    }

    async fn hello(&self, peer: PeerId, height: u64, genesis_hash: shared_types::Hash) {
        if genesis_hash != self.blockchain.genesis_hash() {
            warn!("{} is on another chain (genesis {})", peer, genesis_hash);
            self.network.drop_peer(&peer).await;
            self.report(NodeError::Handshake {
                peer,
                reason: format!("genesis {} differs", genesis_hash),
            });
            return;
        }
        info!("handshake with {} done, height {}", peer, height);
        self.synchronizer.new_node(peer, height);
    }

    async fn dispatch(&self, from: PeerId, message: Message) {
        let kind = message.kind();
        let result: Result<(), NodeError> = match message {
            Message::Hello { .. } => Ok(()),
            Message::NewTransaction(transaction) => self
                .accept_transaction(transaction, Some(&from))
                .await
                .map(|_| ()),
            Message::NewBlock { block, consensus } => self
                .synchronizer
                .new_block(&from, block, consensus)
                .await
                .map_err(NodeError::from),
            Message::NewBlockHeight { height } => {
                self.synchronizer.new_block_height(&from, height);
                Ok(())
            }
            Message::NewConsensusMessage(message) => self
                .engine
                .new_consensus_message(message)
                .await
                .map_err(NodeError::from),
        };
        if let Err(e) = result {
            debug!("{} from {} failed", kind, from);
            self.report(e);
        }
    }
}

#[async_trait]
impl<S, D, N> PeerHandler for ChainCore<S, D, N>
where
    S: KeyValueStore + 'static,
    D: Dapp + 'static,
    N: PeerNetwork + 'static,
{
    async fn on_connect(&self, peer: PeerId) {
        self.handshake(peer).await;
    }

    async fn on_message(&self, from: PeerId, message: Message) {
        if let Message::Hello {
            height,
            genesis_hash,
        } = message
        {
            self.hello(from, height, genesis_hash).await;
            return;
        }
        if self.remote_nodes.get(&from).is_none() {
            debug!("ignoring {} from {} before handshake", message.kind(), from);
            return;
        }
        self.dispatch(from, message).await;
    }

    async fn on_request(&self, from: PeerId, request: Request) -> Result<Response, PeerError> {
        if self.remote_nodes.get(&from).is_none() {
            return Err(PeerError::UnknownPeer(from));
        }
        self.responder
            .respond(request)
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))
    }

    async fn on_disconnect(&self, peer: PeerId) {
        if self.remote_nodes.delete(&peer).is_some() {
            info!("goodbye {}", peer);
        }
    }
}

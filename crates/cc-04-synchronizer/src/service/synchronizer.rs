//! Client side of the sync protocol.

use crate::config::SynchronizerConfig;
use crate::domain::{validate_header_batch, SyncError, SyncResult};
use cc_02_remote_nodes::{PeerId, PeerNetwork, RemoteNode, RemoteNodeSet};
use cc_03_consensus::ReachedBlockSink;
use shared_types::{Block, BlockBody, Consensus, Request, Response};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tracing::{debug, info, warn};

/// Fetches blocks the network has and we do not.
///
/// Progress is driven by peer announcements (`new_node`,
/// `new_block_height`, `new_block`), which wake `run`.
pub struct Synchronizer<N, B> {
    config: SynchronizerConfig,
    network: Arc<N>,
    remote_nodes: Arc<RemoteNodeSet>,
    sink: Arc<B>,
    wake: Notify,
}

impl<N, B> Synchronizer<N, B>
where
    N: PeerNetwork,
    B: ReachedBlockSink,
{
    pub fn new(
        config: SynchronizerConfig,
        network: Arc<N>,
        remote_nodes: Arc<RemoteNodeSet>,
        sink: Arc<B>,
    ) -> Self {
        Self {
            config,
            network,
            remote_nodes,
            sink,
            wake: Notify::new(),
        }
    }

    pub fn remote_nodes(&self) -> &Arc<RemoteNodeSet> {
        &self.remote_nodes
    }

    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// A peer finished the handshake at `height`.
    pub fn new_node(&self, peer_id: PeerId, height: u64) -> Arc<RemoteNode> {
        let node = self.remote_nodes.add(RemoteNode::new(peer_id, height));
        node.update_height(height);
        self.wake();
        node
    }

    /// A peer announced it reached `height`.
    pub fn new_block_height(&self, peer_id: &PeerId, height: u64) {
        if let Some(node) = self.remote_nodes.get(peer_id) {
            node.update_height(height);
        }
        self.wake();
    }

    /// A peer sent a committed block. Applied at once when it extends the
    /// tip, otherwise left to a fetch round.
    pub async fn new_block(
        &self,
        peer_id: &PeerId,
        block: Block,
        consensus: Consensus,
    ) -> SyncResult<()> {
        let height = block.height();
        if let Some(node) = self.remote_nodes.get(peer_id) {
            node.update_height(height);
        }
        let tip = self.sink.chain_height().await?;
        if height != tip + 1 {
            if height > tip {
                self.wake();
            }
            return Ok(());
        }

        match self.sink.add_reached_block(block, consensus).await {
            Ok(()) => {
                debug!("[cc-04] applied announced block #{} from {}", height, peer_id);
                Ok(())
            }
            Err(source) => {
                let e = SyncError::Rejected {
                    peer: peer_id.clone(),
                    height,
                    source,
                };
                if e.is_peer_fault() {
                    self.drop_peer(peer_id).await;
                }
                Err(e)
            }
        }
    }

    /// One fetch round from an idle provider. Returns the number of blocks
    /// applied; zero when in sync or no provider is free.
    pub async fn synchronize(&self) -> SyncResult<usize> {
        let tip = self.sink.chain_height().await?;
        let target = match self.remote_nodes.best_node() {
            Some(best) if best.height() > tip => best.height(),
            _ => return Ok(0),
        };
        let from = tip + 1;
        let Some(provider) = self.remote_nodes.pick_idle_provider(from) else {
            return Ok(0);
        };
        let Some(_guard) = provider.try_acquire() else {
            return Ok(0);
        };

        let peer_id = provider.peer_id.clone();
        debug!(
            "[cc-04] fetching from #{} (network at #{}) from {}",
            from, target, peer_id
        );
        match self.fetch(&peer_id, from, provider.height()).await {
            Ok(applied) => {
                info!(
                    "[cc-04] synchronized #{}..#{} from {}",
                    from,
                    from + applied as u64 - 1,
                    peer_id
                );
                Ok(applied)
            }
            Err(e) => {
                if e.is_peer_fault() {
                    warn!("[cc-04] dropping {}: {}", peer_id, e);
                    self.drop_peer(&peer_id).await;
                }
                Err(e)
            }
        }
    }

    async fn fetch(&self, peer_id: &PeerId, from: u64, to: u64) -> SyncResult<usize> {
        let count = (to - from + 1).min(self.config.max_headers_per_request);

        let headers = match self
            .request(peer_id, Request::GetHeaders { from, count })
            .await?
        {
            Response::Headers(headers) if !headers.is_empty() => headers,
            other => return Err(unexpected(peer_id, "headers", &other)),
        };
        validate_header_batch(from, &headers)?;

        let count = headers.len() as u64;
        let bodies = match self
            .request(peer_id, Request::GetBodies { from, count })
            .await?
        {
            Response::Bodies(bodies) if bodies.len() == headers.len() => bodies,
            other => return Err(unexpected(peer_id, "bodies", &other)),
        };

        let last = from + count - 1;
        let last_consensus = match self
            .request(peer_id, Request::GetConsentedHeader { height: last })
            .await?
        {
            Response::ConsentedHeader { header, consensus }
                if Some(&header) == headers.last() =>
            {
                consensus
            }
            other => return Err(unexpected(peer_id, "consented header", &other)),
        };

        let consensuses = commit_records(&bodies, last_consensus);
        let blocks = headers.into_iter().zip(bodies);
        for ((header, body), consensus) in blocks.zip(consensuses) {
            let block = Block { header, body };
            let height = block.height();
            self.sink
                .add_reached_block(block, consensus)
                .await
                .map_err(|source| SyncError::Rejected {
                    peer: peer_id.clone(),
                    height,
                    source,
                })?;
        }
        Ok(count as usize)
    }

    async fn request(&self, peer_id: &PeerId, request: Request) -> SyncResult<Response> {
        tokio::time::timeout(
            self.config.request_timeout,
            self.network.request(peer_id, request),
        )
        .await
        .map_err(|_| SyncError::Timeout(peer_id.clone()))?
        .map_err(SyncError::from)
    }

    async fn drop_peer(&self, peer_id: &PeerId) {
        self.remote_nodes.delete(peer_id);
        self.network.drop_peer(peer_id).await;
    }

    /// Run fetch rounds until shutdown, sleeping between announcements.
    pub async fn run<E>(&self, mut shutdown_rx: watch::Receiver<bool>, errors: mpsc::UnboundedSender<E>)
    where
        E: From<SyncError>,
    {
        info!("[cc-04] synchronizer started");
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            match self.synchronize().await {
                Ok(0) => {}
                Ok(_) => continue,
                Err(e) => {
                    let fatal = e.is_fatal();
                    let retry = e.is_peer_fault();
                    let _ = errors.send(E::from(e));
                    if fatal {
                        break;
                    }
                    if retry {
                        continue;
                    }
                }
            }
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = self.wake.notified() => {}
            }
        }
        info!("[cc-04] synchronizer stopped");
    }
}

/// Quorum for each fetched block: block `i`'s is embedded in body `i + 1`.
fn commit_records(bodies: &[BlockBody], last: Consensus) -> Vec<Consensus> {
    bodies
        .iter()
        .skip(1)
        .map(|body| body.last_block_consensus.clone())
        .chain(std::iter::once(last))
        .collect()
}

fn unexpected(peer_id: &PeerId, expected: &str, got: &Response) -> SyncError {
    let got = match got {
        Response::Headers(headers) => format!("{} headers", headers.len()),
        Response::Bodies(bodies) => format!("{} bodies", bodies.len()),
        Response::ConsentedHeader { header, .. } => {
            format!("consented header #{}", header.height)
        }
    };
    SyncError::UnexpectedResponse {
        peer: peer_id.clone(),
        detail: format!("expected {}, got {}", expected, got),
    }
}

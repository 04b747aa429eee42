//! The assembled node.

use crate::container::NodeConfig;
use crate::errors::{NodeError, NodeResult};
use cc_01_chain_ledger::{Blockchain, KeyValueStore};
use cc_02_remote_nodes::{PeerId, PeerNetwork, RemoteNodeSet};
use cc_03_consensus::{
    ConsensusDependencies, ConsensusEngine, Dapp, EngineHandle, InMemoryTransactionPool, NodeLoop,
    TransactionPool,
};
use cc_04_synchronizer::{Responder, Synchronizer};
use parking_lot::Mutex;
use shared_crypto::{Hashable, Signer};
use shared_types::{Message, Transaction};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Engine handle as wired by `ChainCore`.
pub type CoreEngine<S, D, N> = EngineHandle<S, D, N, InMemoryTransactionPool<D>>;

/// Everything a node is built from.
pub struct ChainCoreDependencies<S, D, N> {
    pub blockchain: Arc<Blockchain<S>>,
    pub dapp: Arc<D>,
    pub network: Arc<N>,
    /// `None` runs a node that follows the chain without voting.
    pub signer: Option<Arc<dyn Signer>>,
    pub config: NodeConfig,
}

pub struct ChainCore<S, D, N> {
    pub(crate) config: NodeConfig,
    pub(crate) blockchain: Arc<Blockchain<S>>,
    pub(crate) network: Arc<N>,
    pub(crate) remote_nodes: Arc<RemoteNodeSet>,
    pub(crate) pool: Arc<InMemoryTransactionPool<D>>,
    pub(crate) engine: Arc<CoreEngine<S, D, N>>,
    pub(crate) synchronizer: Arc<Synchronizer<N, CoreEngine<S, D, N>>>,
    pub(crate) responder: Responder<S>,
    pub(crate) errors: mpsc::UnboundedSender<NodeError>,
    shutdown_tx: watch::Sender<bool>,
    node_loop: Mutex<Option<NodeLoop>>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S, D, N> ChainCore<S, D, N>
where
    S: KeyValueStore + 'static,
    D: Dapp + 'static,
    N: PeerNetwork + 'static,
{
    /// Wire a node. Errors from its background tasks arrive on the
    /// returned receiver.
    pub fn new(deps: ChainCoreDependencies<S, D, N>) -> (Self, mpsc::UnboundedReceiver<NodeError>) {
        let ChainCoreDependencies {
            blockchain,
            dapp,
            network,
            signer,
            config,
        } = deps;

        let remote_nodes = Arc::new(RemoteNodeSet::new());
        let pool = Arc::new(InMemoryTransactionPool::new(
            dapp.clone(),
            config.pool.clone(),
        ));
        let engine = Arc::new(EngineHandle::new(ConsensusEngine::new(
            ConsensusDependencies {
                blockchain: blockchain.clone(),
                dapp,
                network: network.clone(),
                remote_nodes: remote_nodes.clone(),
                pool: pool.clone(),
                signer,
                config: config.consensus.clone(),
            },
        )));
        let synchronizer = Arc::new(Synchronizer::new(
            config.synchronizer.clone(),
            network.clone(),
            remote_nodes.clone(),
            engine.clone(),
        ));
        let responder = Responder::new(blockchain.clone(), config.synchronizer.clone());
        let (errors, errors_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);

        let core = Self {
            config,
            blockchain,
            network,
            remote_nodes,
            pool,
            engine,
            synchronizer,
            responder,
            errors,
            shutdown_tx,
            node_loop: Mutex::new(None),
            sync_task: Mutex::new(None),
        };
        (core, errors_rx)
    }

    pub fn blockchain(&self) -> &Arc<Blockchain<S>> {
        &self.blockchain
    }

    pub fn engine(&self) -> &Arc<CoreEngine<S, D, N>> {
        &self.engine
    }

    pub fn remote_nodes(&self) -> &Arc<RemoteNodeSet> {
        &self.remote_nodes
    }

    pub fn pool(&self) -> &Arc<InMemoryTransactionPool<D>> {
        &self.pool
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Committed tip.
    pub async fn height(&self) -> NodeResult<u64> {
        Ok(self.blockchain.height().await?)
    }

    /// Ready the ledger, initialize the engine and spawn the engine loop
    /// and the synchronizer.
    pub async fn start(&self) -> NodeResult<()> {
        if self.node_loop.lock().is_some() {
            return Err(NodeError::AlreadyStarted);
        }
        self.blockchain.ready().await?;
        self.engine.initialize().await?;

        let node_loop = NodeLoop::start(self.engine.clone(), self.errors.clone());
        let synchronizer = self.synchronizer.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let errors = self.errors.clone();
        let sync_task =
            tokio::spawn(async move { synchronizer.run(shutdown_rx, errors).await });

        *self.node_loop.lock() = Some(node_loop);
        *self.sync_task.lock() = Some(sync_task);
        info!(
            "node started at #{} (genesis {})",
            self.blockchain.height().await?,
            self.blockchain.genesis_hash()
        );
        Ok(())
    }

    /// Signal shutdown and wait for the background tasks. Idempotent.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        let node_loop = self.node_loop.lock().take();
        if let Some(node_loop) = node_loop {
            node_loop.stop();
            if let Err(e) = node_loop.join().await {
                warn!("node loop ended with error: {}", e);
            }
        }
        let sync_task = self.sync_task.lock().take();
        if let Some(sync_task) = sync_task {
            if let Err(e) = sync_task.await {
                warn!("synchronizer task failed: {}", e);
            }
        }
        info!("node stopped");
    }

    /// Add a locally submitted transaction to the pool and gossip it.
    /// `Ok(false)` if it was already pending.
    pub async fn send_transaction(&self, transaction: Transaction) -> NodeResult<bool> {
        self.accept_transaction(transaction, None).await
    }

    /// Pool `transaction`, relaying it on first sight to a sample of
    /// peers other than `from`.
    pub(crate) async fn accept_transaction(
        &self,
        transaction: Transaction,
        from: Option<&PeerId>,
    ) -> NodeResult<bool> {
        if self.pool.contains(&transaction.hash()) {
            return Ok(false);
        }
        if !self.engine.add_transaction(transaction.clone()).await? {
            return Ok(false);
        }
        let receivers: Vec<_> = self
            .remote_nodes
            .pick_transaction_receivers(self.config.network.transaction_receiver_exponent)
            .into_iter()
            .filter(|node| Some(&node.peer_id) != from)
            .collect();
        if !receivers.is_empty() {
            self.network
                .broadcast(&receivers, Message::NewTransaction(transaction))
                .await;
        }
        Ok(true)
    }

    /// Forward a background error to the operator.
    pub(crate) fn report(&self, error: NodeError) {
        warn!("{}", error);
        let _ = self.errors.send(error);
    }
}

impl<S, D, N> Drop for ChainCore<S, D, N> {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

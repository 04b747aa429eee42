//! Shared handle to an engine.
//!
//! The node loop, the message dispatcher and the synchronizer all drive the
//! same engine. Each entry point takes the async mutex for one operation,
//! so operations never interleave. Anything that may unblock the loop
//! wakes it.

use crate::domain::{ConsensusResult, Progress};
use crate::engine::ConsensusEngine;
use crate::node_loop::NodeTask;
use crate::ports::{Dapp, ReachedBlockSink, TransactionPool};
use async_trait::async_trait;
use cc_01_chain_ledger::KeyValueStore;
use cc_02_remote_nodes::PeerNetwork;
use shared_types::{Block, Consensus, ConsensusMessage, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::time::Instant;

pub struct EngineHandle<S, D, N, P> {
    engine: Arc<Mutex<ConsensusEngine<S, D, N, P>>>,
    wake: Arc<Notify>,
}

impl<S, D, N, P> Clone for EngineHandle<S, D, N, P> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            wake: self.wake.clone(),
        }
    }
}

impl<S, D, N, P> EngineHandle<S, D, N, P>
where
    S: KeyValueStore,
    D: Dapp,
    N: PeerNetwork,
    P: TransactionPool,
{
    pub fn new(engine: ConsensusEngine<S, D, N, P>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            wake: Arc::new(Notify::new()),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, ConsensusEngine<S, D, N, P>> {
        self.engine.lock().await
    }

    /// Let the node loop step again.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub async fn initialize(&self) -> ConsensusResult<()> {
        self.engine.lock().await.initialize().await
    }

    pub async fn new_consensus_message(&self, message: ConsensusMessage) -> ConsensusResult<()> {
        let result = self.engine.lock().await.new_consensus_message(message).await;
        self.wake();
        result
    }

    /// Pool a transaction. `Ok(false)` if it was already pending.
    pub async fn add_transaction(&self, transaction: Transaction) -> ConsensusResult<bool> {
        let pool = self.engine.lock().await.pool().clone();
        let added = pool
            .add(transaction)
            .await
            .map_err(crate::domain::ConsensusError::Pool)?;
        if added {
            self.wake();
        }
        Ok(added)
    }
}

#[async_trait]
impl<S, D, N, P> NodeTask for EngineHandle<S, D, N, P>
where
    S: KeyValueStore + 'static,
    D: Dapp + 'static,
    N: PeerNetwork + 'static,
    P: TransactionPool + 'static,
{
    async fn step(&self) -> ConsensusResult<Progress> {
        self.engine.lock().await.proceed_consensus().await
    }

    async fn deadline(&self) -> Option<Instant> {
        self.engine.lock().await.deadline()
    }

    async fn on_timeout(&self) -> ConsensusResult<()> {
        self.engine.lock().await.on_timeout().await
    }

    fn wake_signal(&self) -> Arc<Notify> {
        self.wake.clone()
    }
}

#[async_trait]
impl<S, D, N, P> ReachedBlockSink for EngineHandle<S, D, N, P>
where
    S: KeyValueStore + 'static,
    D: Dapp + 'static,
    N: PeerNetwork + 'static,
    P: TransactionPool + 'static,
{
    async fn add_reached_block(&self, block: Block, consensus: Consensus) -> ConsensusResult<()> {
        let result = self
            .engine
            .lock()
            .await
            .add_reached_block(block, consensus)
            .await;
        self.wake();
        result
    }

    async fn chain_height(&self) -> ConsensusResult<u64> {
        let blockchain = self.engine.lock().await.blockchain().clone();
        blockchain.ready().await?;
        Ok(blockchain.height().await?)
    }
}

//! The chain ledger: lifecycle, reads and appends under one reader/writer
//! lock.

use super::block_store::BlockStore;
use crate::adapters::serializer::encode;
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::keys::KeyPrefix;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use shared_types::{Block, BlockBody, BlockHeader, Consensus, Hash, Hashable, ValidatorSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Append-only ledger of committed blocks.
///
/// `tokio::sync::RwLock` queues acquisitions fairly, so a waiting writer is
/// never starved by a stream of readers and vice versa.
pub struct Blockchain<S> {
    store: RwLock<BlockStore<S>>,
    genesis: Block,
    initial_validator_set: ValidatorSet,
    ready: AtomicBool,
}

impl<S: KeyValueStore> Blockchain<S> {
    pub fn new(kv_store: S, genesis: Block, initial_validator_set: ValidatorSet) -> Self {
        Self {
            store: RwLock::new(BlockStore::new(kv_store)),
            genesis,
            initial_validator_set,
            ready: AtomicBool::new(false),
        }
    }

    /// Seed a fresh store with genesis and check that a reused store belongs
    /// to this chain. Idempotent.
    pub async fn ready(&self) -> LedgerResult<()> {
        if self.is_ready() {
            return Ok(());
        }
        if self.genesis.header.next_validator_set_root != self.initial_validator_set.root() {
            return Err(LedgerError::GenesisValidatorSetMismatch);
        }

        {
            let mut store = self.store.write().await;
            if store.height()? == 0 {
                store.put_header(&self.genesis.header)?;
                store.put_body(1, &self.genesis.body)?;
            }
            store.put_validator_set(&self.initial_validator_set)?;
        }

        let stored = self.header_of(1).await?;
        if stored.hash() != self.genesis.hash() {
            tracing::error!(
                "[cc-01] stored genesis {} differs from configured {}",
                stored.hash(),
                self.genesis.hash()
            );
            return Err(LedgerError::InvalidGenesis);
        }

        self.ready.store(true, Ordering::Release);
        tracing::info!(
            "[cc-01] ledger ready, genesis {}, tip #{}",
            self.genesis.hash(),
            self.height().await?
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn ensure_ready(&self) -> LedgerResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(LedgerError::NotReady)
        }
    }

    /// Configured genesis block.
    pub fn genesis_block(&self) -> &Block {
        &self.genesis
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis.hash()
    }

    pub fn initial_validator_set(&self) -> &ValidatorSet {
        &self.initial_validator_set
    }

    /// Committed tip. 0 until the genesis quorum is appended.
    pub async fn height(&self) -> LedgerResult<u64> {
        self.ensure_ready()?;
        self.store.read().await.height()
    }

    pub async fn header_of(&self, height: u64) -> LedgerResult<BlockHeader> {
        self.store
            .read()
            .await
            .header(height)?
            .ok_or(LedgerError::HeaderNotFound { height })
    }

    pub async fn body_of(&self, height: u64) -> LedgerResult<BlockBody> {
        self.store
            .read()
            .await
            .body(height)?
            .ok_or(LedgerError::BodyNotFound { height })
    }

    pub async fn hash_of(&self, height: u64) -> LedgerResult<Hash> {
        Ok(self.header_of(height).await?.hash())
    }

    pub async fn block_of(&self, height: u64) -> LedgerResult<Block> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        Self::read_block(&store, height)
    }

    /// Block at the tip.
    pub async fn last_block(&self) -> LedgerResult<Block> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        let height = store.height()?;
        Self::read_block(&store, height.max(1))
    }

    fn read_block(store: &BlockStore<S>, height: u64) -> LedgerResult<Block> {
        let header = store
            .header(height)?
            .ok_or(LedgerError::HeaderNotFound { height })?;
        let body = store
            .body(height)?
            .ok_or(LedgerError::BodyNotFound { height })?;
        Ok(Block { header, body })
    }

    /// Validator set voting on `height`: the one announced by header
    /// `height - 1` (genesis announces the set for heights 1 and 2).
    pub async fn validator_set_of(&self, height: u64) -> LedgerResult<ValidatorSet> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        let announcing = if height <= 1 { 1 } else { height - 1 };
        let header = store
            .header(announcing)?
            .ok_or(LedgerError::HeaderNotFound { height: announcing })?;
        store
            .validator_set(&header.next_validator_set_root)?
            .ok_or(LedgerError::ValidatorSetNotFound {
                root: header.next_validator_set_root,
            })
    }

    /// Quorum that committed `height`. The tip's quorum lives in the
    /// last-consensus slot, older ones in the following body.
    pub async fn consensus_of(&self, height: u64) -> LedgerResult<Consensus> {
        self.ensure_ready()?;
        let store = self.store.read().await;
        let tip = store.height()?;
        if height == 0 || height > tip {
            return Err(LedgerError::ConsensusNotFound { height });
        }
        if height == tip {
            return store
                .last_consensus()?
                .ok_or(LedgerError::ConsensusNotFound { height });
        }
        store
            .body(height + 1)?
            .map(|body| body.last_block_consensus)
            .ok_or(LedgerError::BodyNotFound { height: height + 1 })
    }

    /// Append the next block with the quorum that committed it and the
    /// validator set its header announces.
    pub async fn append_block(
        &self,
        block: &Block,
        consensus: &Consensus,
        next_validator_set: &ValidatorSet,
    ) -> LedgerResult<()> {
        self.ensure_ready()?;
        let height = block.height();
        let hash = block.hash();

        let mut store = self.store.write().await;
        let tip = store.height()?;
        if height != tip + 1 {
            return Err(LedgerError::NonSequentialHeight {
                expected: tip + 1,
                actual: height,
            });
        }
        if height == 1 {
            if hash != self.genesis.hash() {
                return Err(LedgerError::InvalidGenesis);
            }
        } else {
            let parent = store
                .header(tip)?
                .ok_or(LedgerError::HeaderNotFound { height: tip })?;
            if block.header.last_block_hash != parent.hash() {
                return Err(LedgerError::ParentMismatch { height });
            }
        }
        if next_validator_set.root() != block.header.next_validator_set_root {
            return Err(LedgerError::ValidatorSetMismatch { height });
        }
        if consensus.vote.height != height || consensus.vote.block_hash != hash {
            return Err(LedgerError::ConsensusMismatch { height });
        }

        // The tip pointer goes last; readers resolve everything through it.
        let operations = vec![
            BatchOperation::put(KeyPrefix::header_key(height), encode(&block.header)?),
            BatchOperation::put(KeyPrefix::body_key(height), encode(&block.body)?),
            BatchOperation::put(
                KeyPrefix::validator_set_key(&next_validator_set.root()),
                encode(next_validator_set)?,
            ),
            BatchOperation::put(KeyPrefix::last_consensus_key(), encode(consensus)?),
            BatchOperation::put(KeyPrefix::height_key(), encode(&height)?),
        ];
        store.commit(operations)?;

        tracing::debug!(
            "[cc-01] appended block #{} {} ({} txs)",
            height,
            hash,
            block.transactions().len()
        );
        Ok(())
    }
}

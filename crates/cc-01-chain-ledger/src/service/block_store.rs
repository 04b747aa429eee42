//! Typed access to ledger records. No locking here; `Blockchain` holds the
//! store behind its reader/writer lock.

use crate::adapters::serializer::{decode, encode};
use crate::domain::errors::LedgerResult;
use crate::domain::keys::KeyPrefix;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use shared_types::{BlockBody, BlockHeader, Consensus, Hash, ValidatorSet};

/// Record-level view of a key-value store.
pub struct BlockStore<S> {
    kv_store: S,
}

impl<S: KeyValueStore> BlockStore<S> {
    pub fn new(kv_store: S) -> Self {
        Self { kv_store }
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> LedgerResult<Option<T>> {
        match self.kv_store.get(key)? {
            Some(data) => decode(&data).map(Some),
            None => Ok(None),
        }
    }

    /// Tip height, 0 when nothing has been committed.
    pub fn height(&self) -> LedgerResult<u64> {
        Ok(self.read(&KeyPrefix::height_key())?.unwrap_or(0))
    }

    pub fn header(&self, height: u64) -> LedgerResult<Option<BlockHeader>> {
        self.read(&KeyPrefix::header_key(height))
    }

    pub fn body(&self, height: u64) -> LedgerResult<Option<BlockBody>> {
        self.read(&KeyPrefix::body_key(height))
    }

    pub fn last_consensus(&self) -> LedgerResult<Option<Consensus>> {
        self.read(&KeyPrefix::last_consensus_key())
    }

    pub fn validator_set(&self, root: &Hash) -> LedgerResult<Option<ValidatorSet>> {
        self.read(&KeyPrefix::validator_set_key(root))
    }

    pub fn put_header(&mut self, header: &BlockHeader) -> LedgerResult<()> {
        self.kv_store
            .put(&KeyPrefix::header_key(header.height), &encode(header)?)?;
        Ok(())
    }

    pub fn put_body(&mut self, height: u64, body: &BlockBody) -> LedgerResult<()> {
        self.kv_store
            .put(&KeyPrefix::body_key(height), &encode(body)?)?;
        Ok(())
    }

    pub fn put_validator_set(&mut self, validator_set: &ValidatorSet) -> LedgerResult<()> {
        self.kv_store.put(
            &KeyPrefix::validator_set_key(&validator_set.root()),
            &encode(validator_set)?,
        )?;
        Ok(())
    }

    /// Apply a batch atomically.
    pub fn commit(&mut self, operations: Vec<BatchOperation>) -> LedgerResult<()> {
        self.kv_store.atomic_batch_write(operations)?;
        Ok(())
    }
}

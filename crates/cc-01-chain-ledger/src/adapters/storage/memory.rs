//! In-memory `KeyValueStore` for tests and devnets.

use crate::domain::errors::KvStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory key-value store.
///
/// A batch is applied under one write guard, so readers never observe half
/// of it.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvStoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KvStoreError> {
        let mut data = self.data.write();
        for op in operations {
            data.insert(op.key, op.value);
        }
        Ok(())
    }
}

//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the Chain Ledger.

use crate::domain::errors::KvStoreError;
use std::sync::Arc;

/// Abstract interface for key-value database operations.
///
/// Synchronous: every call is a local lookup or write, made by the ledger
/// while it holds its async lock.
///
/// Production: `RocksDbStore` (node-runtime, `rocksdb` feature)
/// Testing: `InMemoryKvStore` (`adapters::storage`)
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either all puts in the batch are applied, or none are.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KvStoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvStoreError> {
        (**self).put(key, value)
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KvStoreError> {
        (**self).atomic_batch_write(operations)
    }
}

/// A put in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOperation {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

//! # RocksDB Storage Adapter
//!
//! Production implementation of the ledger's `KeyValueStore` port.
//!
//! ## Features
//!
//! - Atomic batch writes (WriteBatch)
//! - Snappy compression
//! - Bloom filters for read optimization
//! - Optional fsync on every write
//!
//! The ledger keeps headers, bodies, validator sets and its tip pointer in
//! one keyspace separated by key prefixes, so a single column family is
//! enough.

use cc_01_chain_ledger::{BatchOperation, KeyValueStore, KvStoreError};
use rocksdb::{BlockBasedOptions, Cache, DBCompressionType, Options, WriteBatch, WriteOptions, DB};
use std::path::{Path, PathBuf};

/// RocksDB configuration for production use
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl RocksDbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }

    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed key-value store implementing the KeyValueStore trait
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create a RocksDB database
    pub fn open(config: RocksDbConfig) -> Result<Self, KvStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(DBCompressionType::Snappy);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path)
            .map_err(|e| KvStoreError::Io(format!("failed to open RocksDB: {}", e)))?;
        tracing::info!("[cc-01] opened RocksDB at {}", config.path.display());
        Ok(Self { db, config })
    }

    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KvStoreError> {
        Self::open(RocksDbConfig::new(path.as_ref()))
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvStoreError> {
        self.db
            .get(key)
            .map_err(|e| KvStoreError::Io(format!("RocksDB get failed: {}", e)))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvStoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| KvStoreError::Io(format!("RocksDB put failed: {}", e)))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KvStoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            batch.put(&op.key, &op.value);
        }
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| KvStoreError::Io(format!("RocksDB batch write failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
            store
                .atomic_batch_write(vec![
                    BatchOperation::put(b"a".to_vec(), b"1".to_vec()),
                    BatchOperation::put(b"b".to_vec(), b"2".to_vec()),
                ])
                .unwrap();
            store.put(b"c", b"3").unwrap();
        }
        let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.get(b"c").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.get(b"d").unwrap(), None);
    }
}

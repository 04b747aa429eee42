//! # In-Memory Transaction Pool
//!
//! Arrival-ordered pending transactions indexed by hash. Admission and
//! post-commit re-checks go through the application's
//! `validate_transaction`.
//!
//! The lock is never held across an await.

use crate::ports::outbound::{Dapp, TransactionPool};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_crypto::{Hash, Hashable};
use shared_types::Transaction;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_transactions: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    order: VecDeque<Hash>,
    by_hash: HashMap<Hash, Transaction>,
}

impl PoolInner {
    fn remove(&mut self, hashes: &HashSet<Hash>) {
        if hashes.is_empty() {
            return;
        }
        self.order.retain(|hash| !hashes.contains(hash));
        self.by_hash.retain(|hash, _| !hashes.contains(hash));
    }
}

pub struct InMemoryTransactionPool<D> {
    dapp: Arc<D>,
    config: PoolConfig,
    inner: Mutex<PoolInner>,
}

impl<D: Dapp> InMemoryTransactionPool<D> {
    pub fn new(dapp: Arc<D>, config: PoolConfig) -> Self {
        Self {
            dapp,
            config,
            inner: Mutex::new(PoolInner::default()),
        }
    }
}

#[async_trait]
impl<D: Dapp + 'static> TransactionPool for InMemoryTransactionPool<D> {
    async fn add(&self, transaction: Transaction) -> Result<bool, String> {
        let hash = transaction.hash();
        {
            let inner = self.inner.lock();
            if inner.by_hash.contains_key(&hash) {
                return Ok(false);
            }
            if inner.by_hash.len() >= self.config.max_transactions {
                return Err(format!(
                    "pool is full ({} transactions)",
                    self.config.max_transactions
                ));
            }
        }
        if !self.dapp.validate_transaction(&transaction).await {
            return Err(format!("transaction {} rejected by application", hash));
        }

        let mut inner = self.inner.lock();
        if inner.by_hash.contains_key(&hash) {
            return Ok(false);
        }
        inner.order.push_back(hash);
        inner.by_hash.insert(hash, transaction);
        debug!("[cc-03] pooled transaction {}", hash);
        Ok(true)
    }

    async fn pending(&self, limit: usize) -> Vec<Transaction> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|hash| inner.by_hash.get(hash))
            .take(limit)
            .cloned()
            .collect()
    }

    async fn update(&self, included: &[Transaction]) {
        let included: HashSet<Hash> = included.iter().map(Hashable::hash).collect();
        let remaining = {
            let mut inner = self.inner.lock();
            inner.remove(&included);
            inner.by_hash.values().cloned().collect::<Vec<_>>()
        };

        let mut invalid = HashSet::new();
        for transaction in remaining {
            if !self.dapp.validate_transaction(&transaction).await {
                invalid.insert(transaction.hash());
            }
        }
        if !invalid.is_empty() {
            debug!("[cc-03] evicting {} stale transactions", invalid.len());
            self.inner.lock().remove(&invalid);
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().by_hash.len()
    }

    fn contains(&self, hash: &Hash) -> bool {
        self.inner.lock().by_hash.contains_key(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AppState, BlockHeader};

    /// Accepts transactions whose payload does not start with `x`.
    struct PickyDapp {
        reject_prefix: Mutex<u8>,
    }

    #[async_trait]
    impl Dapp for PickyDapp {
        async fn connect(&self) -> Result<AppState, String> {
            Ok(AppState::new(0, Hash::ZERO))
        }

        async fn validate_transaction(&self, transaction: &Transaction) -> bool {
            transaction.data.first() != Some(&*self.reject_prefix.lock())
        }

        async fn select_transactions(&self, pending: Vec<Transaction>) -> Option<Vec<Transaction>> {
            Some(pending)
        }

        async fn execute_transactions(
            &self,
            _transactions: &[Transaction],
            header: &BlockHeader,
        ) -> Result<AppState, String> {
            Ok(AppState::new(header.height, Hash::ZERO))
        }
    }

    fn pool(max_transactions: usize) -> (Arc<PickyDapp>, InMemoryTransactionPool<PickyDapp>) {
        let dapp = Arc::new(PickyDapp {
            reject_prefix: Mutex::new(b'x'),
        });
        let pool = InMemoryTransactionPool::new(dapp.clone(), PoolConfig { max_transactions });
        (dapp, pool)
    }

    #[tokio::test]
    async fn test_add_dedups_and_validates() {
        let (_, pool) = pool(10);
        assert_eq!(pool.add(Transaction::new("a")).await, Ok(true));
        assert_eq!(pool.add(Transaction::new("a")).await, Ok(false));
        assert!(pool.add(Transaction::new("xa")).await.is_err());
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&Transaction::new("a").hash()));
    }

    #[tokio::test]
    async fn test_capacity() {
        let (_, pool) = pool(2);
        pool.add(Transaction::new("a")).await.unwrap();
        pool.add(Transaction::new("b")).await.unwrap();
        assert!(pool.add(Transaction::new("c")).await.is_err());
    }

    #[tokio::test]
    async fn test_pending_keeps_arrival_order() {
        let (_, pool) = pool(10);
        for data in ["c", "a", "b"] {
            pool.add(Transaction::new(data)).await.unwrap();
        }
        let pending = pool.pending(2).await;
        assert_eq!(pending, vec![Transaction::new("c"), Transaction::new("a")]);
    }

    #[tokio::test]
    async fn test_update_removes_included_and_revalidates() {
        let (dapp, pool) = pool(10);
        for data in ["a", "b", "c"] {
            pool.add(Transaction::new(data)).await.unwrap();
        }
        *dapp.reject_prefix.lock() = b'c';
        pool.update(&[Transaction::new("a")]).await;

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending(10).await, vec![Transaction::new("b")]);
        assert!(!pool.is_empty());
    }
}

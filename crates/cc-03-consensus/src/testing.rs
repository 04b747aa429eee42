//! Test doubles for the application port.

use crate::ports::outbound::Dapp;
use async_trait::async_trait;
use shared_crypto::Hash;
use shared_types::{AppState, BlockHeader, Transaction};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts executed transactions. The state hash is
/// `keccak("state: <count>")`, so two nodes agree exactly when they
/// executed the same number of transactions.
#[derive(Debug, Default)]
pub struct CountingDapp {
    tx_count: AtomicU64,
    height: AtomicU64,
}

impl CountingDapp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_hash(tx_count: u64) -> Hash {
        Hash::from_data(format!("state: {}", tx_count))
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.height.load(Ordering::SeqCst),
            Self::state_hash(self.tx_count.load(Ordering::SeqCst)),
        )
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count.load(Ordering::SeqCst)
    }

    pub fn set_tx_count(&self, count: u64) {
        self.tx_count.store(count, Ordering::SeqCst);
    }

    pub fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }
}

#[async_trait]
impl Dapp for CountingDapp {
    async fn connect(&self) -> Result<AppState, String> {
        Ok(self.app_state())
    }

    async fn validate_transaction(&self, _transaction: &Transaction) -> bool {
        true
    }

    async fn select_transactions(&self, pending: Vec<Transaction>) -> Option<Vec<Transaction>> {
        Some(pending)
    }

    async fn execute_transactions(
        &self,
        transactions: &[Transaction],
        _header: &BlockHeader,
    ) -> Result<AppState, String> {
        self.tx_count
            .fetch_add(transactions.len() as u64, Ordering::SeqCst);
        self.height.fetch_add(1, Ordering::SeqCst);
        Ok(self.app_state())
    }
}

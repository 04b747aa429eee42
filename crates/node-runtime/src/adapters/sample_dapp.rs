//! # Sample Application
//!
//! A key/value store driven by JSON transactions:
//!
//! ```json
//! {"sender": "alice", "nonce": 0, "key": "color", "value": "blue"}
//! ```
//!
//! Each sender's nonces must run 0, 1, 2, ... A transaction with any other
//! nonce, or one that does not parse, fails on its own: its writes are
//! rolled back and the rest of the block still executes.
//!
//! The state hash is the merkle root over the sorted entries, nonce
//! counters included.

use async_trait::async_trait;
use cc_03_consensus::Dapp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_crypto::{merkle_root, Hash};
use shared_types::{AppState, BlockHeader, Transaction};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Payload of a sample transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleTransaction {
    pub sender: String,
    pub nonce: u64,
    pub key: String,
    pub value: String,
}

impl SampleTransaction {
    pub fn new(
        sender: impl Into<String>,
        nonce: u64,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            nonce,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn encode(&self) -> Result<Transaction, serde_json::Error> {
        Ok(Transaction::new(serde_json::to_vec(self)?))
    }

    pub fn decode(transaction: &Transaction) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(&transaction.data)
    }
}

#[derive(Debug, Default, Clone)]
struct SampleState {
    height: u64,
    entries: BTreeMap<String, String>,
}

impl SampleState {
    fn nonce_key(sender: &str) -> String {
        format!("nonce/{}", sender)
    }

    fn data_key(key: &str) -> String {
        format!("data/{}", key)
    }

    fn next_nonce(&self, sender: &str) -> u64 {
        self.entries
            .get(&Self::nonce_key(sender))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    fn apply(&mut self, tx: &SampleTransaction) -> Result<(), String> {
        let expected = self.next_nonce(&tx.sender);
        if tx.nonce != expected {
            return Err(format!(
                "nonce {} from {}, expected {}",
                tx.nonce, tx.sender, expected
            ));
        }
        self.entries
            .insert(Self::data_key(&tx.key), tx.value.clone());
        self.entries
            .insert(Self::nonce_key(&tx.sender), (expected + 1).to_string());
        Ok(())
    }

    fn hash(&self) -> Hash {
        let leaves: Vec<Hash> = self
            .entries
            .iter()
            .map(|(key, value)| Hash::from_data(format!("{}={}", key, value)))
            .collect();
        merkle_root(&leaves)
    }

    fn app_state(&self) -> AppState {
        AppState::new(self.height, self.hash())
    }
}

/// In-memory key/value application.
#[derive(Debug, Default)]
pub struct SampleDapp {
    state: Mutex<SampleState>,
}

impl SampleDapp {
    pub fn new() -> Self {
        Self::default()
    }

    /// State hash before any transaction; use it as the genesis app state.
    pub fn initial_state_hash() -> Hash {
        SampleState::default().hash()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .entries
            .get(&SampleState::data_key(key))
            .cloned()
    }

    /// Nonce the next transaction from `sender` must carry.
    pub fn next_nonce(&self, sender: &str) -> u64 {
        self.state.lock().next_nonce(sender)
    }

    pub fn app_state(&self) -> AppState {
        self.state.lock().app_state()
    }
}

#[async_trait]
impl Dapp for SampleDapp {
    async fn connect(&self) -> Result<AppState, String> {
        let app_state = self.app_state();
        info!(
            "sample app connected at #{} {}",
            app_state.height, app_state.hash
        );
        Ok(app_state)
    }

    async fn validate_transaction(&self, transaction: &Transaction) -> bool {
        SampleTransaction::decode(transaction).is_ok()
    }

    async fn select_transactions(&self, pending: Vec<Transaction>) -> Option<Vec<Transaction>> {
        Some(pending)
    }

    async fn execute_transactions(
        &self,
        transactions: &[Transaction],
        header: &BlockHeader,
    ) -> Result<AppState, String> {
        let mut state = self.state.lock();
        if header.height != state.height + 1 {
            return Err(format!(
                "asked to execute #{} after #{}",
                header.height, state.height
            ));
        }
        for transaction in transactions {
            let mut staged = state.clone();
            let applied = SampleTransaction::decode(transaction)
                .map_err(|e| e.to_string())
                .and_then(|tx| staged.apply(&tx));
            match applied {
                Ok(()) => *state = staged,
                Err(reason) => debug!("sample app skipped transaction: {}", reason),
            }
        }
        state.height = header.height;
        Ok(state.app_state())
    }
}

//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use shared_crypto::Hash;
use shared_types::{AppState, BlockHeader, Transaction};

/// The application whose state the chain orders transactions for.
#[async_trait]
pub trait Dapp: Send + Sync {
    /// Report the last executed height and state.
    async fn connect(&self) -> Result<AppState, String>;

    /// Cheap admission check for pool entry and received blocks.
    async fn validate_transaction(&self, transaction: &Transaction) -> bool;

    /// Pick the transactions of the next block from pending ones.
    /// `None` means propose no block this round.
    async fn select_transactions(&self, pending: Vec<Transaction>) -> Option<Vec<Transaction>>;

    /// Execute a committed block. The returned state must report the
    /// block's height.
    async fn execute_transactions(
        &self,
        transactions: &[Transaction],
        header: &BlockHeader,
    ) -> Result<AppState, String>;
}

/// Pending transactions awaiting inclusion.
#[async_trait]
pub trait TransactionPool: Send + Sync {
    /// Admit a transaction. `Ok(false)` if it is already pending.
    async fn add(&self, transaction: Transaction) -> Result<bool, String>;

    /// Up to `limit` transactions in arrival order.
    async fn pending(&self, limit: usize) -> Vec<Transaction>;

    /// Drop `included` and re-check whatever remains.
    async fn update(&self, included: &[Transaction]);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, hash: &Hash) -> bool;
}

/// Time source for block timestamps
pub trait TimeSource: Send + Sync {
    /// Get current unix timestamp in milliseconds
    fn now(&self) -> u64;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

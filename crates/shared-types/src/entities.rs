//! # Chain Entities
//!
//! Transactions, headers and bodies. Blocks are created once and never
//! mutated; the header hash is the canonical chain pointer.

use crate::consensus::Consensus;
use crate::errors::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use shared_crypto::{merkle_root, Hash, Hashable, KeccakHasher};

/// Opaque application transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub data: Vec<u8>,
}

impl Transaction {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl Hashable for Transaction {
    fn hash(&self) -> Hash {
        Hash::from_data(&self.data)
    }
}

/// Ordered transactions of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
}

impl TransactionList {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Merkle root over the transaction hashes.
    pub fn root(&self) -> Hash {
        merkle_root(&self.transactions)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    /// Seconds since the unix epoch.
    pub timestamp: u64,
    pub last_block_hash: Hash,
    pub transactions_root: Hash,
    pub last_consensus_hash: Hash,
    pub next_validator_set_root: Hash,
    /// Application state after executing the previous block.
    pub app_state_hash: Hash,
}

impl Hashable for BlockHeader {
    fn hash(&self) -> Hash {
        let mut hasher = KeccakHasher::new();
        hasher
            .update(self.height.to_be_bytes())
            .update(self.timestamp.to_be_bytes())
            .update(self.last_block_hash)
            .update(self.transactions_root)
            .update(self.last_consensus_hash)
            .update(self.next_validator_set_root)
            .update(self.app_state_hash);
        hasher.finalize()
    }
}

/// Block body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    pub transaction_list: TransactionList,
    /// Precommit quorum of the previous block.
    pub last_block_consensus: Consensus,
}

/// A header with its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    /// Build a block whose header commits to the given body.
    pub fn construct(
        height: u64,
        timestamp: u64,
        last_block_hash: Hash,
        next_validator_set_root: Hash,
        app_state_hash: Hash,
        transactions: Vec<Transaction>,
        last_block_consensus: Consensus,
    ) -> Self {
        let transaction_list = TransactionList::new(transactions);
        let header = BlockHeader {
            height,
            timestamp,
            last_block_hash,
            transactions_root: transaction_list.root(),
            last_consensus_hash: last_block_consensus.hash(),
            next_validator_set_root,
            app_state_hash,
        };
        Self {
            header,
            body: BlockBody {
                transaction_list,
                last_block_consensus,
            },
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.body.transaction_list.transactions
    }

    /// Check that the header commits to this body.
    pub fn verify_body(&self) -> ValidationResult<()> {
        if self.header.transactions_root != self.body.transaction_list.root() {
            return Err(ValidationError::TransactionsRootMismatch);
        }
        if self.header.last_consensus_hash != self.body.last_block_consensus.hash() {
            return Err(ValidationError::ConsensusHashMismatch);
        }
        Ok(())
    }
}

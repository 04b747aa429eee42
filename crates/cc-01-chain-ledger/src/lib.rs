//! # Chain Ledger (cc-01)
//!
//! Append-only store of committed blocks: headers and bodies by height, the
//! tip pointer, the tip's precommit quorum and validator sets by root.
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Sequential Heights | Block `H` is appended only on top of tip `H - 1` |
//! | Genesis Identity | The stored header at height 1 hashes to the configured genesis |
//! | One-Block Delay | `validator_set_of(H)` resolves the root announced by header `H - 1` |
//! | Atomic Append | Header, body, validator set, last consensus and tip land in one batch |
//! | Single Writer | Mutations hold the write lock, multi-step reads the read lock |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Errors and key layout
//! - `ports/` - `KeyValueStore` outbound port
//! - `adapters/` - Record serialization and the in-memory store
//! - `service/` - `BlockStore` (typed records) and `Blockchain` (lifecycle and locking)
//!
//! ## Usage
//!
//! ```ignore
//! use cc_01_chain_ledger::{Blockchain, InMemoryKvStore};
//!
//! let chain = Blockchain::new(InMemoryKvStore::new(), genesis, validators);
//! chain.ready().await?;
//! let tip = chain.height().await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::errors::{KvStoreError, LedgerError, LedgerResult};
pub use domain::keys::KeyPrefix;
pub use adapters::storage::InMemoryKvStore;
pub use ports::outbound::{BatchOperation, KeyValueStore};
pub use service::{BlockStore, Blockchain};

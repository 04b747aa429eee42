//! # Ledger Service
//!
//! `BlockStore` maps records to keys; `Blockchain` owns it behind the
//! reader/writer lock and enforces the chain lifecycle.

mod block_store;
mod blockchain;


pub use block_store::BlockStore;
pub use blockchain::Blockchain;

//! Adapters for the Consensus ports.

pub mod pool;

pub use pool::{InMemoryTransactionPool, PoolConfig};

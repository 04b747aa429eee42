//! Storage backends for the ledger.

mod memory;

pub use memory::InMemoryKvStore;

//! Adapters used by the ledger service.

pub mod serializer;
pub mod storage;

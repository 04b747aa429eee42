//! Bincode encoding of ledger records.

use crate::domain::errors::{LedgerError, LedgerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a record for storage.
pub fn encode<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Decode a stored record.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> LedgerResult<T> {
    bincode::deserialize(data).map_err(|e| LedgerError::Serialization(e.to_string()))
}

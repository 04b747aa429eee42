//! # Keccak-256 Hashing
//!
//! Every content address in the chain (headers, transactions, votes,
//! validator sets) is a keccak-256 digest.

use crate::CryptoError;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// 32 byte keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Nil marker: "no prior block" and "no vote".
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// Wrap raw digest bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash arbitrary data.
    pub fn from_data(data: impl AsRef<[u8]>) -> Self {
        keccak256(data.as_ref())
    }

    /// Parse from a 32 byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Parse from hex, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// True for the nil marker.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{}..)", &self.to_hex()[..8])
    }
}

/// Anything with a canonical content hash.
pub trait Hashable {
    /// Content hash of the value.
    fn hash(&self) -> Hash;
}

impl Hashable for Hash {
    fn hash(&self) -> Hash {
        *self
    }
}

/// Stateful keccak-256 hasher for hashing records field by field.
#[derive(Clone, Default)]
pub struct KeccakHasher {
    inner: Keccak256,
}

impl KeccakHasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with data.
    pub fn update(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.inner.update(data.as_ref());
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        Hash(self.inner.finalize().into())
    }
}

/// Hash data with keccak-256 (one-shot).
pub fn keccak256(data: &[u8]) -> Hash {
    Hash(Keccak256::digest(data).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_digest() {
        assert_eq!(
            keccak256(b"").to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = KeccakHasher::new();
        hasher.update(b"hello ").update(b"world");
        assert_eq!(hasher.finalize(), keccak256(b"hello world"));
    }

    #[test]
    fn test_hex_roundtrip_accepts_prefix() {
        let hash = Hash::from_data("block");
        assert_eq!(Hash::from_hex(&hash.to_string()).unwrap(), hash);
        assert_eq!(Hash::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert_eq!(
            Hash::from_slice(&[1u8; 31]),
            Err(CryptoError::InvalidLength {
                expected: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn test_zero_is_nil() {
        assert!(Hash::ZERO.is_zero());
        assert!(!Hash::from_data("x").is_zero());
    }
}

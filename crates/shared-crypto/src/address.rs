//! Validator addresses.

use crate::ecdsa::PublicKey;
use crate::hashing::keccak256;
use crate::CryptoError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 20 byte account address: the last 20 bytes of `keccak256(public_key)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive the address of an uncompressed public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = keccak256(public_key.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[12..]);
        Self(bytes)
    }

    /// Parse from hex, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let array: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidLength {
                expected: 20,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_known_key_address() {
        // Secret key 1 is the generator point.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let keypair = KeyPair::from_secret(secret).unwrap();
        assert_eq!(
            keypair.address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_hex_roundtrip() {
        let address = KeyPair::generate().address();
        assert_eq!(Address::from_hex(&address.to_string()).unwrap(), address);
    }

    #[test]
    fn test_hex_wrong_length() {
        assert!(matches!(
            Address::from_hex("0x1234"),
            Err(CryptoError::InvalidLength { expected: 20, .. })
        ));
    }
}

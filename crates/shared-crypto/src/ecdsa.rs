//! # Recoverable ECDSA Signatures (secp256k1)
//!
//! Validators sign 32 byte digests. A signature carries its recovery byte so
//! the signer's address is recovered from `(digest, signature)` alone and no
//! public key travels with votes.
//!
//! ## Wire Format
//!
//! `r (32) || s (32) || v (1)` with `v ∈ {27, 28}`.

use crate::{Address, CryptoError, Hash};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use zeroize::Zeroize;

/// Uncompressed secp256k1 public key without the `0x04` prefix (64 bytes).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde_as(as = "Bytes")] [u8; 64]);

impl PublicKey {
    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let mut bytes = [0u8; 64];
        // Skip the 0x04 SEC1 tag.
        bytes.copy_from_slice(&point.as_bytes()[1..65]);
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Address derived from this key.
    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(0x{}..)", hex::encode(&self.0[..8]))
    }
}

/// Recoverable signature (65 bytes, r||s||v).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] [u8; 65]);

impl Signature {
    /// Length of the wire encoding.
    pub const LENGTH: usize = 65;

    /// Create from bytes, rejecting recovery bytes other than 27/28.
    pub fn from_bytes(bytes: [u8; 65]) -> Result<Self, CryptoError> {
        match bytes[64] {
            27 | 28 => Ok(Self(bytes)),
            v => Err(CryptoError::InvalidRecoveryId(v)),
        }
    }

    /// Create from a slice of exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 65] = bytes.try_into().map_err(|_| CryptoError::InvalidLength {
            expected: Self::LENGTH,
            actual: bytes.len(),
        })?;
        Self::from_bytes(array)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Recover the public key that produced this signature over `digest`.
    pub fn recover(&self, digest: &Hash) -> Result<PublicKey, CryptoError> {
        let recovery_id = match self.0[64] {
            v @ (27 | 28) => RecoveryId::from_byte(v - 27),
            _ => None,
        }
        .ok_or(CryptoError::InvalidRecoveryId(self.0[64]))?;

        let signature =
            EcdsaSignature::from_slice(&self.0[..64]).map_err(|_| CryptoError::RecoveryFailed)?;
        let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &signature, recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Ok(PublicKey::from_verifying_key(&key))
    }

    /// Recover the signer's address.
    pub fn address(&self, digest: &Hash) -> Result<Address, CryptoError> {
        self.recover(digest).map(|key| key.address())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{}..)", hex::encode(&self.0[..8]))
    }
}

/// Signing capability held by a validator.
pub trait Signer: Send + Sync {
    /// Address votes signed by this signer recover to.
    fn address(&self) -> Address;

    /// Sign a 32 byte digest.
    fn sign(&self, digest: &Hash) -> Result<Signature, CryptoError>;
}

/// secp256k1 keypair.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_secret(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Create from a hex encoded secret key.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let secret: Result<[u8; 32], _> = bytes.as_slice().try_into();
        let len = bytes.len();
        bytes.zeroize();
        let mut secret = secret.map_err(|_| CryptoError::InvalidLength {
            expected: 32,
            actual: len,
        })?;
        let keypair = Self::from_secret(secret);
        secret.zeroize();
        keypair
    }

    /// Get the uncompressed public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Get the address of this keypair.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign a digest (deterministic RFC 6979).
    pub fn sign(&self, digest: &Hash) -> Result<Signature, CryptoError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + 27;
        Ok(Signature(bytes))
    }
}

impl Signer for KeyPair {
    fn address(&self) -> Address {
        KeyPair::address(self)
    }

    fn sign(&self, digest: &Hash) -> Result<Signature, CryptoError> {
        KeyPair::sign(self, digest)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

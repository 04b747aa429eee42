//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid byte length for a fixed width value
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Recovery byte outside of 27/28
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public key could not be recovered from the signature
    #[error("Signature recovery failed")]
    RecoveryFailed,

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Invalid hex input
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

//! # Shared Crypto - Concord Chain Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256 | Block, vote and transaction digests |
//! | `ecdsa` | secp256k1 (recoverable) | Validator signatures, address recovery |
//! | `address` | keccak(pubkey)[12..] | Validator identity |
//! | `merkle` | Keccak-256 binary tree | Transaction and validator set roots |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, 65 byte `r || s || v` signatures
//! - **Merkle**: a lone leaf is never re-hashed, the split point is the largest
//!   power of two strictly below the item count

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod merkle;

// Re-exports
pub use address::Address;
pub use ecdsa::{KeyPair, PublicKey, Signature, Signer};
pub use errors::CryptoError;
pub use hashing::{keccak256, Hash, Hashable, KeccakHasher};
pub use merkle::{merkle_root, split_point};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

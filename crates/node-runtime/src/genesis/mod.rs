//! # Genesis Module
//!
//! The genesis block is the foundation of the chain:
//!
//! - Height: 1
//! - Last block hash: `keccak(unique)`, which makes each chain's genesis
//!   distinct even with identical validators
//! - Last consensus: an empty quorum over `Vote(0, 1, keccak(unique))`
//! - Next validator set root: the initial validator set, in force for
//!   heights 1 and 2
//!
//! Nodes exchange the genesis hash in their handshake; peers on another
//! chain are dropped.

pub mod builder;

pub use builder::{devnet_keys, GenesisBuilder, GenesisConfig, GenesisError};

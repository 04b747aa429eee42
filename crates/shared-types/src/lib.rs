//! # Shared Types Crate
//!
//! Block, consensus and protocol types of Concord Chain.
//!
//! ## Design Principles
//!
//! - **Content addressed**: every record that is referenced by another
//!   (headers, validator sets, consensus records) exposes a keccak `hash()`
//!   that is a pure function of its fields.
//! - **Domain separated signing**: proposals, prevotes and precommits hash to
//!   distinct digests for the same vote, so a signature never replays across
//!   phases.
//! - **One-block delay**: the validator set voting on height `H` is the one
//!   announced by the header at `H - 1`.

pub mod app;
pub mod consensus;
pub mod entities;
pub mod errors;
pub mod protocol;
pub mod validator;

pub use app::AppState;
pub use consensus::{Consensus, ConsensusMessage, Proposal, SignedVote, Vote, VoteKind};
pub use entities::{Block, BlockBody, BlockHeader, Transaction, TransactionList};
pub use errors::{ValidationError, ValidationResult};
pub use protocol::{Message, Request, Response};
pub use validator::{Validator, ValidatorSet};

pub use shared_crypto::{Address, Hash, Hashable};

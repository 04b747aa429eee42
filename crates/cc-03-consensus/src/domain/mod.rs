//! Consensus domain: configuration, errors, vote bookkeeping and the state
//! of the current height.

pub mod config;
pub mod error;
pub mod execution;
pub mod round;
pub mod vote_set;

pub use config::{ConsensusConfig, ProofBlockPolicy};
pub use error::{ConsensusError, ConsensusResult, ErrorClass};
pub use execution::ExecutionState;
pub use round::{Progress, RoundState, Step};
pub use vote_set::HeightVoteSet;

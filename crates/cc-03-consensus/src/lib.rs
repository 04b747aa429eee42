//! # Consensus (cc-03)
//!
//! Tendermint-style BFT agreement on the next block, with application
//! execution pipelined one block behind.
//!
//! ## Height Lifecycle
//!
//! ```text
//! committed tip H ──execute H──► propose H+1 ──prevote──► precommit ──► commit H+1
//!        ▲                         (round r)      >2/3       >2/3          │
//!        └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Block `H + 1` carries the application state after block `H`. A block
//! with transactions is therefore followed by a proof block certifying
//! the state they produced.
//!
//! ## Safety Rules
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | Quorum | Strictly more than 2/3 of voting power |
//! | Domain separation | Proposal, prevote and precommit sign distinct digests bound to genesis |
//! | No equivocation | A second, different vote from a validator in a round is rejected |
//! | Locking | A validator that precommitted a block prevotes nil on other blocks until a newer polka |
//! | Validator delay | The set voting on `H` is announced by header `H - 1` |
//!
//! ## Crate Structure
//!
//! - `domain/` - Configuration, errors, vote sets, round and execution state
//! - `ports/` - `Dapp`, `TransactionPool`, `TimeSource`, `ReachedBlockSink`
//! - `adapters/` - In-memory transaction pool
//! - `engine/` - `ConsensusEngine`: execution, construction, validation, rounds
//! - `handle` - `EngineHandle` shared by loop, dispatcher and synchronizer
//! - `node_loop` - `NodeLoop` background driver

pub mod adapters;
pub mod domain;
pub mod engine;
pub mod handle;
pub mod node_loop;
pub mod ports;
pub mod testing;

pub use adapters::{InMemoryTransactionPool, PoolConfig};
pub use domain::{
    ConsensusConfig, ConsensusError, ConsensusResult, ErrorClass, ExecutionState, HeightVoteSet,
    ProofBlockPolicy, Progress, RoundState, Step,
};
pub use engine::{ConsensusDependencies, ConsensusEngine};
pub use handle::EngineHandle;
pub use node_loop::{NodeLoop, NodeTask};
pub use ports::{Dapp, ReachedBlockSink, SystemTimeSource, TimeSource, TransactionPool};

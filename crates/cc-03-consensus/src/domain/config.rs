//! Consensus configuration.

use super::round::Step;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When to propose a block without transactions that certifies the
/// application state after executing the tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProofBlockPolicy {
    /// The executed tip carried transactions.
    #[default]
    TipHasTransactions,
    /// The executed state differs from what the tip header recorded.
    StateChanged,
}

/// Consensus configuration
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Wait for a proposal in round 0.
    pub timeout_propose: Duration,
    /// Wait for a prevote quorum in round 0.
    pub timeout_prevote: Duration,
    /// Wait for a precommit quorum in round 0.
    pub timeout_precommit: Duration,
    /// Added to every timeout per round.
    pub timeout_delta: Duration,
    pub max_block_transactions: usize,
    pub proof_block_policy: ProofBlockPolicy,
    /// Fan-out exponent for `NewBlockHeight` announcements.
    pub block_receiver_exponent: f64,
    /// Messages for the next height kept until we get there.
    pub max_future_messages: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            timeout_propose: Duration::from_millis(3000),
            timeout_prevote: Duration::from_millis(1000),
            timeout_precommit: Duration::from_millis(1000),
            timeout_delta: Duration::from_millis(500),
            max_block_transactions: 1000,
            proof_block_policy: ProofBlockPolicy::default(),
            block_receiver_exponent: 0.5,
            max_future_messages: 256,
        }
    }
}

impl ConsensusConfig {
    /// Short timeouts and full fan-out.
    pub fn for_testing() -> Self {
        Self {
            timeout_propose: Duration::from_millis(300),
            timeout_prevote: Duration::from_millis(200),
            timeout_precommit: Duration::from_millis(200),
            timeout_delta: Duration::from_millis(100),
            block_receiver_exponent: 1.0,
            ..Self::default()
        }
    }

    /// Timeout of `step` in `round`.
    pub fn timeout(&self, step: Step, round: u32) -> Duration {
        let base = match step {
            Step::Propose => self.timeout_propose,
            Step::Prevote => self.timeout_prevote,
            Step::Precommit => self.timeout_precommit,
        };
        base + self.timeout_delta * round
    }
}

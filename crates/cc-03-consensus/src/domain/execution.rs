//! Application execution progress.

use shared_types::{AppState, Hash, ValidatorSet};

/// What the application has executed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionState {
    /// Last executed height.
    pub height: u64,
    pub app_state_hash: Hash,
    /// Validator set announced by the last execution, if any.
    pub next_validator_set: Option<ValidatorSet>,
}

impl ExecutionState {
    pub fn apply(&mut self, state: &AppState) {
        self.height = state.height;
        self.app_state_hash = state.hash;
        self.next_validator_set = state.next_validator_set.clone();
    }
}

impl From<AppState> for ExecutionState {
    fn from(state: AppState) -> Self {
        Self {
            height: state.height,
            app_state_hash: state.hash,
            next_validator_set: state.next_validator_set,
        }
    }
}

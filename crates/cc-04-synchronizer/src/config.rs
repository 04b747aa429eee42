//! # Synchronizer Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SynchronizerConfig {
    /// Headers (and bodies) per request, on both sides.
    pub max_headers_per_request: u64,

    /// Wait for one response before dropping the peer.
    pub request_timeout: Duration,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            max_headers_per_request: 128,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SynchronizerConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            max_headers_per_request: 4,
            request_timeout: Duration::from_millis(500),
        }
    }
}

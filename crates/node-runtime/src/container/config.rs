//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Every value has a default; `NodeConfig::from_env` applies `CC_*`
//! overrides on top. A variable that is set but unparsable is an error,
//! never silently ignored.

use cc_03_consensus::{ConsensusConfig, PoolConfig};
use cc_04_synchronizer::SynchronizerConfig;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Clone, Default)]
pub struct NodeConfig {
    /// Peer handling.
    pub network: NetworkConfig,
    /// Ledger storage.
    pub storage: StorageConfig,
    /// Round timeouts, proof block policy, fan-out.
    pub consensus: ConsensusConfig,
    /// Catch-up batching and request timeout.
    pub synchronizer: SynchronizerConfig,
    /// Transaction pool limits.
    pub pool: PoolConfig,
    /// Hex secret key of this validator. `None` runs a non-voting node.
    pub validator_key: Option<String>,
    /// Validators spawned by the binary's devnet mode.
    pub devnet_validators: usize,
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("network", &self.network)
            .field("storage", &self.storage)
            .field("consensus", &self.consensus)
            .field("synchronizer", &self.synchronizer)
            .field("pool", &self.pool)
            .field("validator_key", &self.validator_key.as_ref().map(|_| "<redacted>"))
            .field("devnet_validators", &self.devnet_validators)
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Peer handling configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// A connected peer must send a matching `Hello` within this window.
    pub handshake_timeout: Duration,
    /// Fan-out exponent for relaying transactions.
    pub transaction_receiver_exponent: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(1000),
            transaction_receiver_exponent: 0.5,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Ledger directory. `None` keeps the ledger in memory.
    pub data_dir: Option<PathBuf>,
}

impl NodeConfig {
    /// Load defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load defaults overridden by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            devnet_validators: 4,
            ..Self::default()
        };

        if let Some(dir) = lookup("CC_DATA_DIR") {
            config.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(ms) = parse::<u64>(&lookup, "CC_HANDSHAKE_TIMEOUT_MS")? {
            config.network.handshake_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "CC_TIMEOUT_PROPOSE_MS")? {
            config.consensus.timeout_propose = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "CC_TIMEOUT_PREVOTE_MS")? {
            config.consensus.timeout_prevote = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "CC_TIMEOUT_PRECOMMIT_MS")? {
            config.consensus.timeout_precommit = Duration::from_millis(ms);
        }
        if let Some(exponent) = parse_exponent(&lookup, "CC_BLOCK_EXPONENT")? {
            config.consensus.block_receiver_exponent = exponent;
        }
        if let Some(exponent) = parse_exponent(&lookup, "CC_TRANSACTION_EXPONENT")? {
            config.network.transaction_receiver_exponent = exponent;
        }
        if let Some(key) = lookup("CC_VALIDATOR_KEY") {
            config.validator_key = Some(key);
        }
        if let Some(count) = parse::<usize>(&lookup, "CC_DEVNET_VALIDATORS")? {
            if count == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "CC_DEVNET_VALIDATORS",
                    value: count.to_string(),
                    reason: "at least one validator is required".into(),
                });
            }
            config.devnet_validators = count;
        }
        Ok(config)
    }

    /// Create a config for testing (short timeouts, full fan-out).
    pub fn for_testing() -> Self {
        Self {
            network: NetworkConfig {
                handshake_timeout: Duration::from_millis(200),
                transaction_receiver_exponent: 1.0,
            },
            storage: StorageConfig::default(),
            consensus: ConsensusConfig::for_testing(),
            synchronizer: SynchronizerConfig::for_testing(),
            pool: PoolConfig::default(),
            validator_key: None,
            devnet_validators: 4,
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
                value,
            }),
    }
}

fn parse_exponent(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<f64>, ConfigError> {
    let exponent = parse::<f64>(lookup, var)?;
    match exponent {
        Some(e) if !(0.0..=1.0).contains(&e) => Err(ConfigError::InvalidValue {
            var,
            value: e.to_string(),
            reason: "exponent must be within 0.0..=1.0".into(),
        }),
        _ => Ok(exponent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = NodeConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.network.handshake_timeout, Duration::from_millis(1000));
        assert_eq!(config.consensus.timeout_propose, Duration::from_millis(3000));
        assert_eq!(config.storage.data_dir, None);
        assert_eq!(config.validator_key, None);
        assert_eq!(config.devnet_validators, 4);
    }

    #[test]
    fn test_overrides() {
        let config = NodeConfig::from_lookup(env(&[
            ("CC_DATA_DIR", "/var/lib/concord"),
            ("CC_HANDSHAKE_TIMEOUT_MS", "2500"),
            ("CC_TIMEOUT_PROPOSE_MS", "900"),
            ("CC_TIMEOUT_PREVOTE_MS", "400"),
            ("CC_TIMEOUT_PRECOMMIT_MS", "450"),
            ("CC_BLOCK_EXPONENT", "0.75"),
            ("CC_TRANSACTION_EXPONENT", " 1.0 "),
            ("CC_DEVNET_VALIDATORS", "7"),
        ]))
        .unwrap();
        assert_eq!(
            config.storage.data_dir,
            Some(PathBuf::from("/var/lib/concord"))
        );
        assert_eq!(config.network.handshake_timeout, Duration::from_millis(2500));
        assert_eq!(config.consensus.timeout_propose, Duration::from_millis(900));
        assert_eq!(config.consensus.timeout_prevote, Duration::from_millis(400));
        assert_eq!(config.consensus.timeout_precommit, Duration::from_millis(450));
        assert_eq!(config.consensus.block_receiver_exponent, 0.75);
        assert_eq!(config.network.transaction_receiver_exponent, 1.0);
        assert_eq!(config.devnet_validators, 7);
    }

    #[test]
    fn test_parse_failures_are_reported() {
        let err = NodeConfig::from_lookup(env(&[("CC_TIMEOUT_PROPOSE_MS", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "CC_TIMEOUT_PROPOSE_MS",
                ..
            }
        ));

        let err = NodeConfig::from_lookup(env(&[("CC_BLOCK_EXPONENT", "2")])).unwrap_err();
        assert!(err.to_string().contains("CC_BLOCK_EXPONENT"));

        assert!(NodeConfig::from_lookup(env(&[("CC_DEVNET_VALIDATORS", "0")])).is_err());
    }

    #[test]
    fn test_debug_redacts_validator_key() {
        let config = NodeConfig {
            validator_key: Some("deadbeef".into()),
            ..NodeConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("deadbeef"));
        assert!(printed.contains("<redacted>"));
    }
}

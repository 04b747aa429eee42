//! # Node Container
//!
//! Node configuration and the environment overrides applied on startup.

pub mod config;

pub use config::{ConfigError, NetworkConfig, NodeConfig, StorageConfig};

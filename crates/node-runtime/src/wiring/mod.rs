//! # Subsystem Wiring
//!
//! `ChainCore` connects the subsystems of one node:
//!
//! ```text
//!              ┌──────────────── PeerNetwork (cc-02) ───────────────┐
//!              │                                                    │
//!   Hello / NewTransaction      NewBlock / NewBlockHeight    NewConsensusMessage
//!              │                          │                         │
//!              ▼                          ▼                         ▼
//!       RemoteNodeSet, pool  ──►  Synchronizer (cc-04)  ──►  EngineHandle (cc-03)
//!                                         ▲                         │
//!                 requests ──► Responder ─┘ reads        commits    ▼
//!                                                        Blockchain (cc-01)
//! ```
//!
//! The engine loop and the synchronizer run as background tasks between
//! `start` and `stop`; their errors arrive on the node's error channel.

pub mod chain_core;

pub use chain_core::{ChainCore, ChainCoreDependencies, CoreEngine};

//! # Devnet
//!
//! A set of nodes running the sample application in one process, linked
//! through a `LocalHub`. The binary runs one; integration tests build
//! their networks with it.

use crate::adapters::{LocalHub, LocalNetwork, SampleDapp};
use crate::container::NodeConfig;
use crate::errors::{NodeError, NodeResult};
use crate::genesis::{devnet_keys, GenesisBuilder, GenesisConfig};
use crate::wiring::{ChainCore, ChainCoreDependencies};
use cc_01_chain_ledger::{Blockchain, InMemoryKvStore, KeyValueStore};
use cc_02_remote_nodes::{PeerError, PeerId};
use shared_crypto::{KeyPair, Signer};
use shared_types::{Block, ValidatorSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

pub type DevnetCore = ChainCore<Arc<dyn KeyValueStore>, SampleDapp, LocalNetwork>;

pub struct DevnetNode {
    pub peer_id: PeerId,
    pub core: Arc<DevnetCore>,
    pub dapp: Arc<SampleDapp>,
    pub errors: mpsc::UnboundedReceiver<NodeError>,
}

pub struct Devnet {
    hub: Arc<LocalHub>,
    config: NodeConfig,
    keys: Vec<KeyPair>,
    genesis: Block,
    validator_set: ValidatorSet,
    pub nodes: Vec<DevnetNode>,
}

impl Devnet {
    /// Genesis for `config.devnet_validators` validators. The configured
    /// validator key, if any, takes the first seat.
    pub fn new(config: NodeConfig) -> NodeResult<Self> {
        let mut keys = devnet_keys(config.devnet_validators)?;
        if let Some(secret) = &config.validator_key {
            let key = KeyPair::from_hex(secret).map_err(crate::genesis::GenesisError::from)?;
            if let Some(first) = keys.first_mut() {
                *first = key;
            }
        }
        let genesis_config = GenesisConfig::devnet(&keys, SampleDapp::initial_state_hash());
        let (genesis, validator_set) = GenesisBuilder::new(genesis_config).build()?;
        Ok(Self {
            hub: LocalHub::new(),
            config,
            keys,
            genesis,
            validator_set,
            nodes: Vec::new(),
        })
    }

    pub fn hub(&self) -> &Arc<LocalHub> {
        &self.hub
    }

    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    pub fn keys(&self) -> &[KeyPair] {
        &self.keys
    }

    /// Add a node named `name`, voting with `key` if given.
    pub fn spawn_node(&mut self, name: &str, key: Option<KeyPair>) -> NodeResult<&DevnetNode> {
        let peer_id = PeerId::new(name);
        let store = open_store(&self.config, name)?;
        let dapp = Arc::new(SampleDapp::new());
        let network = Arc::new(self.hub.network(peer_id.clone()));
        let signer = key.map(|key| Arc::new(key) as Arc<dyn Signer>);
        let (core, errors) = ChainCore::new(ChainCoreDependencies {
            blockchain: Arc::new(Blockchain::new(
                store,
                self.genesis.clone(),
                self.validator_set.clone(),
            )),
            dapp: dapp.clone(),
            network,
            signer,
            config: self.config.clone(),
        });
        let core = Arc::new(core);
        self.hub.register(peer_id.clone(), &core);
        self.nodes.push(DevnetNode {
            peer_id,
            core,
            dapp,
            errors,
        });
        let index = self.nodes.len() - 1;
        Ok(&self.nodes[index])
    }

    /// One node per validator key, named `validator-<i>`.
    pub fn spawn_validators(&mut self) -> NodeResult<()> {
        for (i, key) in self.keys.clone().into_iter().enumerate() {
            self.spawn_node(&format!("validator-{}", i), Some(key))?;
        }
        Ok(())
    }

    pub async fn start_all(&self) -> NodeResult<()> {
        for node in &self.nodes {
            node.core.start().await?;
        }
        info!("devnet of {} nodes started", self.nodes.len());
        Ok(())
    }

    /// Link every pair of nodes.
    pub fn connect_all(&self) -> Result<(), PeerError> {
        let peers: Vec<PeerId> = self.nodes.iter().map(|n| n.peer_id.clone()).collect();
        self.hub.connect_all(&peers)
    }

    pub async fn stop_all(&self) {
        for node in &self.nodes {
            node.core.stop().await;
        }
    }

    /// Lowest committed height across nodes.
    pub async fn min_height(&self) -> NodeResult<u64> {
        let mut min = u64::MAX;
        for node in &self.nodes {
            min = min.min(node.core.height().await?);
        }
        Ok(if self.nodes.is_empty() { 0 } else { min })
    }
}

#[cfg(feature = "rocksdb")]
fn open_store(config: &NodeConfig, name: &str) -> NodeResult<Arc<dyn KeyValueStore>> {
    use crate::adapters::RocksDbStore;
    use cc_01_chain_ledger::LedgerError;

    match &config.storage.data_dir {
        Some(dir) => {
            let store = RocksDbStore::open_default(dir.join(name)).map_err(LedgerError::from)?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryKvStore::new())),
    }
}

#[cfg(not(feature = "rocksdb"))]
fn open_store(config: &NodeConfig, name: &str) -> NodeResult<Arc<dyn KeyValueStore>> {
    if config.storage.data_dir.is_some() {
        tracing::warn!(
            "{}: built without the rocksdb feature, keeping the ledger in memory",
            name
        );
    }
    Ok(Arc::new(InMemoryKvStore::new()))
}

//! Handshake rules of `ChainCore` over the in-process network.

use async_trait::async_trait;
use cc_01_chain_ledger::{Blockchain, InMemoryKvStore, KeyValueStore};
use cc_02_remote_nodes::{PeerError, PeerId, PeerNetwork};
use node_runtime::adapters::{LocalHub, PeerHandler, SampleDapp};
use node_runtime::devnet::Devnet;
use node_runtime::genesis::{devnet_keys, GenesisBuilder, GenesisConfig};
use node_runtime::{ChainCore, ChainCoreDependencies, NodeConfig, NodeError};
use parking_lot::Mutex;
use shared_types::{Hash, Message, Request, Response};
use std::sync::Arc;
use std::time::Duration;

/// Records traffic and never answers a handshake on its own.
#[derive(Default)]
struct SilentPeer {
    received: Mutex<Vec<Message>>,
}

#[async_trait]
impl PeerHandler for SilentPeer {
    async fn on_connect(&self, _peer: PeerId) {}

    async fn on_message(&self, _from: PeerId, message: Message) {
        self.received.lock().push(message);
    }

    async fn on_request(&self, _from: PeerId, _request: Request) -> Result<Response, PeerError> {
        Ok(Response::Headers(vec![]))
    }

    async fn on_disconnect(&self, _peer: PeerId) {}
}

fn devnet() -> Devnet {
    let config = NodeConfig {
        devnet_validators: 1,
        ..NodeConfig::for_testing()
    };
    let mut devnet = Devnet::new(config).unwrap();
    devnet.spawn_node("node", None).unwrap();
    devnet
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_hello_is_sent_on_connect() {
    let devnet = devnet();
    let node = &devnet.nodes[0];
    node.core.start().await.unwrap();
    let stranger = Arc::new(SilentPeer::default());
    let stranger_id = PeerId::new("stranger");
    devnet.hub().register(stranger_id.clone(), &stranger);
    devnet.hub().connect(&node.peer_id, &stranger_id).unwrap();

    wait_until(|| !stranger.received.lock().is_empty()).await;
    assert_eq!(
        stranger.received.lock()[0],
        Message::Hello {
            height: 0,
            genesis_hash: devnet.genesis().hash(),
        }
    );
    node.core.stop().await;
}

#[tokio::test]
async fn test_silent_peer_is_dropped_after_timeout() {
    let devnet = devnet();
    let node = &devnet.nodes[0];
    let stranger = Arc::new(SilentPeer::default());
    let stranger_id = PeerId::new("stranger");
    devnet.hub().register(stranger_id.clone(), &stranger);
    devnet.hub().connect(&node.peer_id, &stranger_id).unwrap();

    assert!(devnet.hub().is_linked(&node.peer_id, &stranger_id));
    wait_until(|| !devnet.hub().is_linked(&node.peer_id, &stranger_id)).await;
    assert!(node.core.remote_nodes().get(&stranger_id).is_none());
}

#[tokio::test]
async fn test_peer_on_another_chain_is_dropped() {
    let mut devnet = devnet();
    let stranger = Arc::new(SilentPeer::default());
    let stranger_id = PeerId::new("stranger");
    devnet.hub().register(stranger_id.clone(), &stranger);
    let node_id = devnet.nodes[0].peer_id.clone();
    devnet.hub().connect(&node_id, &stranger_id).unwrap();

    let stranger_net = devnet.hub().network(stranger_id.clone());
    stranger_net
        .send(
            &node_id,
            Message::Hello {
                height: 7,
                genesis_hash: Hash::from_data("another chain"),
            },
        )
        .await
        .unwrap();

    wait_until(|| !devnet.hub().is_linked(&node_id, &stranger_id)).await;
    let node = &mut devnet.nodes[0];
    assert!(node.core.remote_nodes().get(&stranger_id).is_none());
    let error = node.errors.recv().await.unwrap();
    assert!(matches!(error, NodeError::Handshake { peer, .. } if peer == stranger_id));
}

#[tokio::test]
async fn test_requests_need_a_handshake() {
    let devnet = devnet();
    let node = &devnet.nodes[0];
    node.core.blockchain().ready().await.unwrap();
    let stranger = Arc::new(SilentPeer::default());
    let stranger_id = PeerId::new("stranger");
    devnet.hub().register(stranger_id.clone(), &stranger);
    devnet.hub().connect(&node.peer_id, &stranger_id).unwrap();
    let stranger_net = devnet.hub().network(stranger_id.clone());

    let request = Request::GetHeaders { from: 1, count: 1 };
    assert_eq!(
        stranger_net.request(&node.peer_id, request.clone()).await,
        Err(PeerError::UnknownPeer(stranger_id.clone()))
    );

    stranger_net
        .send(
            &node.peer_id,
            Message::Hello {
                height: 0,
                genesis_hash: devnet.genesis().hash(),
            },
        )
        .await
        .unwrap();
    wait_until(|| node.core.remote_nodes().get(&stranger_id).is_some()).await;

    // nothing committed yet: genesis is only stored, not agreed on
    assert_eq!(
        stranger_net.request(&node.peer_id, request).await,
        Ok(Response::Headers(vec![]))
    );
}

#[tokio::test]
async fn test_cores_on_different_genesis_never_pair() {
    let hub = LocalHub::new();
    let keys = devnet_keys(1).unwrap();
    let mut cores = Vec::new();
    for unique in ["chain a", "chain b"] {
        let mut genesis_config = GenesisConfig::devnet(&keys, SampleDapp::initial_state_hash());
        genesis_config.unique = unique.to_string();
        let (genesis, validator_set) = GenesisBuilder::new(genesis_config).build().unwrap();
        let peer_id = PeerId::new(unique);
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKvStore::new());
        let (core, _errors) = ChainCore::new(ChainCoreDependencies {
            blockchain: Arc::new(Blockchain::new(store, genesis, validator_set)),
            dapp: Arc::new(SampleDapp::new()),
            network: Arc::new(hub.network(peer_id.clone())),
            signer: None,
            config: NodeConfig::for_testing(),
        });
        let core = Arc::new(core);
        hub.register(peer_id.clone(), &core);
        core.blockchain().ready().await.unwrap();
        cores.push((peer_id, core));
    }

    hub.connect(&cores[0].0, &cores[1].0).unwrap();
    wait_until(|| !hub.is_linked(&cores[0].0, &cores[1].0)).await;
    assert!(cores[0].1.remote_nodes().is_empty());
    assert!(cores[1].1.remote_nodes().is_empty());
}

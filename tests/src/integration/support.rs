//! Devnet setup and polling helpers shared by the integration tests.

use node_runtime::adapters::SampleTransaction;
use node_runtime::devnet::{Devnet, DevnetNode};
use node_runtime::NodeConfig;
use shared_types::Transaction;
use std::future::Future;
use std::sync::Once;
use std::time::Duration;

/// Upper bound for anything the network has to agree on.
pub const PATIENCE: Duration = Duration::from_secs(30);

static TRACING: Once = Once::new();

/// Log to the test output when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

/// A devnet of `validators` validator nodes, none started yet.
pub fn devnet(validators: usize) -> Devnet {
    init_tracing();
    let config = NodeConfig {
        devnet_validators: validators,
        ..NodeConfig::for_testing()
    };
    let mut devnet = Devnet::new(config).expect("devnet genesis");
    devnet.spawn_validators().expect("validators");
    devnet
}

/// Start `nodes` and link them pairwise, then wait for every handshake.
pub async fn start_and_link(devnet: &Devnet, nodes: &[usize]) {
    for &i in nodes {
        devnet.nodes[i].core.start().await.expect("node start");
    }
    let peers: Vec<_> = nodes
        .iter()
        .map(|&i| devnet.nodes[i].peer_id.clone())
        .collect();
    devnet.hub().connect_all(&peers).expect("link");
    let expected = nodes.len() - 1;
    eventually("handshakes", || async {
        nodes
            .iter()
            .all(|&i| devnet.nodes[i].core.remote_nodes().len() >= expected)
    })
    .await;
}

/// Poll `check` until it holds, failing the test after `PATIENCE`.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let reached = tokio::time::timeout(PATIENCE, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {}", what);
}

pub fn transfer(sender: &str, nonce: u64, key: &str, value: &str) -> Transaction {
    SampleTransaction::new(sender, nonce, key, value)
        .encode()
        .expect("encodable transaction")
}

pub async fn height(node: &DevnetNode) -> u64 {
    node.core.height().await.expect("ledger ready")
}

/// All `nodes` store the same blocks up to `height`.
pub async fn assert_same_chain(devnet: &Devnet, nodes: &[usize], height: u64) {
    let reference = devnet.nodes[nodes[0]].core.blockchain();
    for h in 1..=height {
        let expected = reference.hash_of(h).await.expect("reference block");
        for &i in &nodes[1..] {
            let actual = devnet.nodes[i]
                .core
                .blockchain()
                .hash_of(h)
                .await
                .expect("block stored");
            assert_eq!(actual, expected, "node {} diverges at #{}", i, h);
        }
    }
}

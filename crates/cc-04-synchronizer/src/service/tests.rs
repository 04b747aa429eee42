use super::*;
use crate::config::SynchronizerConfig;
use crate::domain::SyncError;
use async_trait::async_trait;
use cc_01_chain_ledger::{Blockchain, InMemoryKvStore};
use cc_02_remote_nodes::testing::RecordingNetwork;
use cc_02_remote_nodes::{PeerError, PeerId, PeerNetwork, RemoteNodeSet};
use cc_03_consensus::testing::CountingDapp;
use cc_03_consensus::{
    ConsensusConfig, ConsensusDependencies, ConsensusEngine, ConsensusError, EngineHandle,
    InMemoryTransactionPool, PoolConfig, ReachedBlockSink, TimeSource, TransactionPool,
};
use parking_lot::Mutex;
use shared_crypto::{Hash, KeyPair, Signer};
use shared_types::{
    Block, Consensus, Message, Request, Response, Transaction, Validator, ValidatorSet, Vote,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

const EPOCH: u64 = 1_520_825_696;

type TestEngine = ConsensusEngine<
    InMemoryKvStore,
    CountingDapp,
    RecordingNetwork,
    InMemoryTransactionPool<CountingDapp>,
>;
type TestHandle = EngineHandle<
    InMemoryKvStore,
    CountingDapp,
    RecordingNetwork,
    InMemoryTransactionPool<CountingDapp>,
>;

struct FixedTime(u64);

impl TimeSource for FixedTime {
    fn now(&self) -> u64 {
        self.0
    }
}

fn genesis(validator_set: &ValidatorSet) -> Block {
    let last_block_hash = Hash::from_data("genesis!");
    Block::construct(
        1,
        EPOCH,
        last_block_hash,
        validator_set.root(),
        Hash::from_data("genesis state"),
        vec![],
        Consensus::new(Vote::new(0, 0, last_block_hash), vec![]),
    )
}

fn engine(key: Option<&KeyPair>, validator_set: &ValidatorSet) -> TestEngine {
    let dapp = Arc::new(CountingDapp::new());
    let blockchain = Arc::new(Blockchain::new(
        InMemoryKvStore::new(),
        genesis(validator_set),
        validator_set.clone(),
    ));
    let pool = Arc::new(InMemoryTransactionPool::new(
        dapp.clone(),
        PoolConfig::default(),
    ));
    let signer = key.map(|key| Arc::new(key.clone()) as Arc<dyn Signer>);
    ConsensusEngine::new(ConsensusDependencies {
        blockchain,
        dapp,
        network: Arc::new(RecordingNetwork::new()),
        remote_nodes: Arc::new(RemoteNodeSet::new()),
        pool,
        signer,
        config: ConsensusConfig::for_testing(),
    })
    .with_time_source(Box::new(FixedTime(EPOCH + 10)))
}

/// A validator that committed genesis plus two transaction blocks, each
/// followed by its proof block: five blocks in all.
async fn source_chain(key: &KeyPair, validator_set: &ValidatorSet) -> TestEngine {
    let mut source = engine(Some(key), validator_set);
    for batch in [&[1, 2][..], &[3][..]] {
        for nonce in batch {
            source
                .pool()
                .add(Transaction::new(format!("{}: transfer", nonce)))
                .await
                .unwrap();
        }
        source.proceed_consensus_until_steady().await.unwrap();
    }
    assert_eq!(source.blockchain().height().await.unwrap(), 5);
    source
}

fn follower(validator_set: &ValidatorSet) -> Arc<TestHandle> {
    Arc::new(EngineHandle::new(engine(None, validator_set)))
}

fn solo_set(key: &KeyPair) -> ValidatorSet {
    ValidatorSet::new(vec![Validator::new(key.address(), 10)]).unwrap()
}

#[derive(Clone, Copy, PartialEq)]
enum Fault {
    None,
    Hang,
    BreakHeaderChain,
    ShortBodies,
}

/// Serves requests from a real ledger, optionally misbehaving.
struct ServingNetwork {
    responder: Responder<InMemoryKvStore>,
    fault: Fault,
    dropped: Mutex<Vec<PeerId>>,
    requests: Mutex<Vec<Request>>,
}

impl ServingNetwork {
    fn new(source: &TestEngine, fault: Fault) -> Self {
        Self {
            responder: Responder::new(
                source.blockchain().clone(),
                SynchronizerConfig::for_testing(),
            ),
            fault,
            dropped: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn dropped(&self) -> Vec<PeerId> {
        self.dropped.lock().clone()
    }
}

#[async_trait]
impl PeerNetwork for ServingNetwork {
    async fn send(&self, _peer: &PeerId, _message: Message) -> Result<(), PeerError> {
        Ok(())
    }

    async fn request(&self, peer: &PeerId, request: Request) -> Result<Response, PeerError> {
        self.requests.lock().push(request.clone());
        if self.fault == Fault::Hang {
            std::future::pending::<()>().await;
        }
        let response = self
            .responder
            .respond(request)
            .await
            .map_err(|e| PeerError::Transport(format!("{}: {}", peer, e)))?;
        Ok(match (self.fault, response) {
            (Fault::BreakHeaderChain, Response::Headers(mut headers)) => {
                if let Some(header) = headers.get_mut(1) {
                    header.last_block_hash = Hash::from_data("elsewhere");
                }
                Response::Headers(headers)
            }
            (Fault::ShortBodies, Response::Bodies(mut bodies)) => {
                bodies.pop();
                Response::Bodies(bodies)
            }
            (_, response) => response,
        })
    }

    async fn drop_peer(&self, peer: &PeerId) {
        self.dropped.lock().push(peer.clone());
    }
}

fn synchronizer(
    network: Arc<ServingNetwork>,
    sink: Arc<TestHandle>,
) -> Synchronizer<ServingNetwork, TestHandle> {
    Synchronizer::new(
        SynchronizerConfig::for_testing(),
        network,
        Arc::new(RemoteNodeSet::new()),
        sink,
    )
}

#[tokio::test]
async fn test_synchronize_in_batches() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let sink = follower(&set);
    let network = Arc::new(ServingNetwork::new(&source, Fault::None));
    let sync = synchronizer(network.clone(), sink.clone());

    assert_eq!(sync.synchronize().await, Ok(0));

    sync.new_node(PeerId::new("source"), 5);
    // four per request, then the remaining one
    assert_eq!(sync.synchronize().await, Ok(4));
    assert_eq!(sync.synchronize().await, Ok(1));
    assert_eq!(sync.synchronize().await, Ok(0));

    assert_eq!(sink.chain_height().await, Ok(5));
    for height in 1..=5 {
        assert_eq!(
            sink.lock().await.blockchain().hash_of(height).await,
            source.blockchain().hash_of(height).await
        );
    }
    assert!(network.dropped().is_empty());
    assert_eq!(
        network.requests.lock()[..3],
        [
            Request::GetHeaders { from: 1, count: 4 },
            Request::GetBodies { from: 1, count: 4 },
            Request::GetConsentedHeader { height: 4 },
        ]
    );
}

#[tokio::test]
async fn test_broken_header_chain_drops_peer() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let sink = follower(&set);
    let network = Arc::new(ServingNetwork::new(&source, Fault::BreakHeaderChain));
    let sync = synchronizer(network.clone(), sink.clone());
    let peer = PeerId::new("liar");

    sync.new_node(peer.clone(), 5);
    let err = sync.synchronize().await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidHeaderChain(_)));
    assert_eq!(network.dropped(), vec![peer.clone()]);
    assert!(sync.remote_nodes().get(&peer).is_none());
    assert_eq!(sink.chain_height().await, Ok(0));
}

#[tokio::test]
async fn test_short_bodies_drop_peer() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let network = Arc::new(ServingNetwork::new(&source, Fault::ShortBodies));
    let sync = synchronizer(network.clone(), follower(&set));

    sync.new_node(PeerId::new("short"), 5);
    let err = sync.synchronize().await.unwrap_err();
    assert!(matches!(err, SyncError::UnexpectedResponse { .. }));
    assert_eq!(network.dropped(), vec![PeerId::new("short")]);
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_peer_times_out() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let network = Arc::new(ServingNetwork::new(&source, Fault::Hang));
    let sync = synchronizer(network.clone(), follower(&set));
    let peer = PeerId::new("silent");

    sync.new_node(peer.clone(), 5);
    assert_eq!(
        sync.synchronize().await,
        Err(SyncError::Timeout(peer.clone()))
    );
    assert_eq!(network.dropped(), vec![peer]);
}

#[tokio::test]
async fn test_block_from_other_chain_is_rejected() {
    let key = KeyPair::generate();
    let other = KeyPair::generate();
    let source = source_chain(&other, &solo_set(&other)).await;
    // same genesis shape, different validator set
    let sink = follower(&solo_set(&key));
    let network = Arc::new(ServingNetwork::new(&source, Fault::None));
    let sync = synchronizer(network.clone(), sink.clone());

    sync.new_node(PeerId::new("fork"), 5);
    let err = sync.synchronize().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Rejected {
            height: 1,
            source: ConsensusError::InvalidBlock { .. },
            ..
        }
    ));
    assert_eq!(network.dropped(), vec![PeerId::new("fork")]);
    assert_eq!(sink.chain_height().await, Ok(0));
}

#[tokio::test]
async fn test_announced_block_applies_directly() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let sink = follower(&set);
    let network = Arc::new(ServingNetwork::new(&source, Fault::None));
    let sync = synchronizer(network.clone(), sink.clone());
    let peer = PeerId::new("source");
    sync.new_node(peer.clone(), 0);

    let chain = source.blockchain();
    let block1 = chain.block_of(1).await.unwrap();
    let block2 = chain.block_of(2).await.unwrap();
    sync.new_block(&peer, block1, chain.consensus_of(1).await.unwrap())
        .await
        .unwrap();
    assert_eq!(sink.chain_height().await, Ok(1));

    // ahead of the tip: only recorded
    let block3 = chain.block_of(3).await.unwrap();
    sync.new_block(&peer, block3, chain.consensus_of(3).await.unwrap())
        .await
        .unwrap();
    assert_eq!(sink.chain_height().await, Ok(1));
    assert_eq!(sync.remote_nodes().get(&peer).unwrap().height(), 3);

    sync.new_block(&peer, block2, chain.consensus_of(2).await.unwrap())
        .await
        .unwrap();
    assert_eq!(sink.chain_height().await, Ok(2));
    assert!(network.requests.lock().is_empty());
}

#[tokio::test]
async fn test_announced_invalid_block_drops_peer() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let sink = follower(&set);
    let network = Arc::new(ServingNetwork::new(&source, Fault::None));
    let sync = synchronizer(network.clone(), sink.clone());
    let peer = PeerId::new("source");
    sync.new_node(peer.clone(), 0);

    let chain = source.blockchain();
    let mut block1 = chain.block_of(1).await.unwrap();
    block1.header.app_state_hash = Hash::from_data("forged");
    let err = sync
        .new_block(&peer, block1, chain.consensus_of(1).await.unwrap())
        .await
        .unwrap_err();
    assert!(err.is_peer_fault());
    assert_eq!(network.dropped(), vec![peer]);
}

#[tokio::test]
async fn test_run_catches_up_and_stops() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let sink = follower(&set);
    let network = Arc::new(ServingNetwork::new(&source, Fault::None));
    let sync = Arc::new(synchronizer(network, sink.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (error_tx, mut error_rx) = mpsc::unbounded_channel::<SyncError>();

    let task = tokio::spawn({
        let sync = sync.clone();
        async move { sync.run(shutdown_rx, error_tx).await }
    });
    sync.new_node(PeerId::new("source"), 5);

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while sink.chain_height().await != Ok(5) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    shutdown_tx.send_replace(true);
    task.await.unwrap();
    assert!(error_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_responder_caps_ranges() {
    let key = KeyPair::generate();
    let set = solo_set(&key);
    let source = source_chain(&key, &set).await;
    let responder = Responder::new(
        source.blockchain().clone(),
        SynchronizerConfig::for_testing(),
    );

    match responder
        .respond(Request::GetHeaders { from: 1, count: 100 })
        .await
        .unwrap()
    {
        Response::Headers(headers) => assert_eq!(headers.len(), 4),
        other => panic!("unexpected {:?}", other),
    }
    match responder
        .respond(Request::GetBodies { from: 4, count: 4 })
        .await
        .unwrap()
    {
        Response::Bodies(bodies) => assert_eq!(bodies.len(), 2),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        responder
            .respond(Request::GetHeaders { from: 6, count: 4 })
            .await,
        Ok(Response::Headers(vec![]))
    );
    assert_eq!(
        responder
            .respond(Request::GetConsentedHeader { height: 5 })
            .await,
        Ok(Response::ConsentedHeader {
            header: source.blockchain().header_of(5).await.unwrap(),
            consensus: source.blockchain().consensus_of(5).await.unwrap(),
        })
    );
    assert!(responder
        .respond(Request::GetConsentedHeader { height: 6 })
        .await
        .is_err());
}

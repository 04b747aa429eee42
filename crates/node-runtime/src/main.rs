//! # Concord Chain Node Runtime
//!
//! Runs a devnet: `CC_DEVNET_VALIDATORS` validators with the sample
//! key/value application, linked in-process. A demo client submits a
//! transaction to the first validator every few seconds.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults + `CC_*` environment)
//! 2. Build genesis for the validator set
//! 3. Spawn one node per validator and link them
//! 4. Start each node: ready the ledger, initialize the engine, spawn the
//!    engine loop and the synchronizer
//! 5. Run until Ctrl+C, then stop every node

use std::time::Duration;

use anyhow::{Context, Result};
use node_runtime::adapters::SampleTransaction;
use node_runtime::devnet::Devnet;
use node_runtime::NodeConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEMO_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::from_env().context("invalid configuration")?;
    info!("===========================================");
    info!("  Concord Chain Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("  Devnet with {} validators", config.devnet_validators);
    info!("===========================================");

    let mut devnet = Devnet::new(config).context("failed to build genesis")?;
    devnet
        .spawn_validators()
        .context("failed to spawn validators")?;
    devnet.start_all().await.context("failed to start nodes")?;
    devnet.connect_all().context("failed to link nodes")?;
    info!("genesis {}", devnet.genesis().hash());

    let mut ticker = tokio::time::interval(DEMO_INTERVAL);
    let mut nonce = 0u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                drain_errors(&mut devnet);
                submit_demo_transaction(&devnet, nonce).await?;
                nonce += 1;
            }
        }
    }

    info!("shutting down");
    devnet.stop_all().await;
    Ok(())
}

async fn submit_demo_transaction(devnet: &Devnet, nonce: u64) -> Result<()> {
    let Some(node) = devnet.nodes.first() else {
        return Ok(());
    };
    let transaction = SampleTransaction::new("demo", nonce, "counter", nonce.to_string())
        .encode()
        .context("failed to encode demo transaction")?;
    match node.core.send_transaction(transaction).await {
        Ok(_) => info!(
            "height {}, counter = {:?}",
            devnet.min_height().await?,
            node.dapp.get("counter")
        ),
        Err(e) => warn!("demo transaction rejected: {}", e),
    }
    Ok(())
}

fn drain_errors(devnet: &mut Devnet) {
    for node in &mut devnet.nodes {
        while let Ok(e) = node.errors.try_recv() {
            if e.is_recoverable() {
                warn!("{}: {}", node.peer_id, e);
            } else {
                error!("{}: {}", node.peer_id, e);
            }
        }
    }
}

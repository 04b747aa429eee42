//! Server side of the sync protocol: answers peers' requests from the
//! local ledger.

use crate::config::SynchronizerConfig;
use crate::domain::SyncResult;
use cc_01_chain_ledger::{Blockchain, KeyValueStore};
use shared_types::{Request, Response};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::debug;

pub struct Responder<S> {
    blockchain: Arc<Blockchain<S>>,
    config: SynchronizerConfig,
}

impl<S: KeyValueStore> Responder<S> {
    pub fn new(blockchain: Arc<Blockchain<S>>, config: SynchronizerConfig) -> Self {
        Self { blockchain, config }
    }

    pub async fn respond(&self, request: Request) -> SyncResult<Response> {
        debug!("[cc-04] serving {:?}", request);
        match request {
            Request::GetHeaders { from, count } => {
                let mut headers = Vec::new();
                for height in self.range(from, count).await?.into_iter().flatten() {
                    headers.push(self.blockchain.header_of(height).await?);
                }
                Ok(Response::Headers(headers))
            }
            Request::GetBodies { from, count } => {
                let mut bodies = Vec::new();
                for height in self.range(from, count).await?.into_iter().flatten() {
                    bodies.push(self.blockchain.body_of(height).await?);
                }
                Ok(Response::Bodies(bodies))
            }
            Request::GetConsentedHeader { height } => {
                let consensus = self.blockchain.consensus_of(height).await?;
                let header = self.blockchain.header_of(height).await?;
                Ok(Response::ConsentedHeader { header, consensus })
            }
        }
    }

    /// Committed heights `from..from + count`, capped by the tip and the
    /// per-request limit.
    async fn range(&self, from: u64, count: u64) -> SyncResult<Option<RangeInclusive<u64>>> {
        let tip = self.blockchain.height().await?;
        let count = count.min(self.config.max_headers_per_request);
        if from == 0 || from > tip || count == 0 {
            return Ok(None);
        }
        Ok(Some(from..=tip.min(from + count - 1)))
    }
}

//! # Peer Protocol
//!
//! Messages a node sends to peers, and the request/response pairs the
//! synchronizer uses to catch up.

use crate::consensus::{Consensus, ConsensusMessage};
use crate::entities::{Block, BlockBody, BlockHeader, Transaction};
use serde::{Deserialize, Serialize};
use shared_crypto::Hash;

/// One-way peer messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Handshake: our tip and the chain we are on.
    Hello { height: u64, genesis_hash: Hash },
    NewTransaction(Transaction),
    /// A committed block with the quorum that committed it.
    NewBlock { block: Block, consensus: Consensus },
    /// Announcement only.
    NewBlockHeight { height: u64 },
    NewConsensusMessage(ConsensusMessage),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "hello",
            Message::NewTransaction(_) => "new_transaction",
            Message::NewBlock { .. } => "new_block",
            Message::NewBlockHeight { .. } => "new_block_height",
            Message::NewConsensusMessage(_) => "new_consensus_message",
        }
    }
}

/// Synchronizer requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Headers `from..from + count`.
    GetHeaders { from: u64, count: u64 },
    /// Bodies `from..from + count`.
    GetBodies { from: u64, count: u64 },
    /// Header at `height` with the consensus that committed it.
    GetConsentedHeader { height: u64 },
}

/// Responses, one variant per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Headers(Vec<BlockHeader>),
    Bodies(Vec<BlockBody>),
    ConsentedHeader {
        header: BlockHeader,
        consensus: Consensus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::Vote;

    #[test]
    fn test_message_wire_roundtrip() {
        let block = Block::construct(
            1,
            0,
            Hash::from_data("unique"),
            Hash::ZERO,
            Hash::ZERO,
            vec![Transaction::new("tx")],
            Consensus::new(Vote::new(0, 1, Hash::from_data("unique")), vec![]),
        );
        let message = Message::NewBlock {
            consensus: block.body.last_block_consensus.clone(),
            block,
        };

        let bytes = bincode::serialize(&message).unwrap();
        let decoded: Message = bincode::deserialize(&bytes).unwrap();

        assert_eq!(decoded, message);
        assert_eq!(decoded.kind(), "new_block");
    }
}

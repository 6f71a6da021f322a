//! Peer communication: broadcasting transactions and blocks, fetching chains.

pub mod client;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::blockchain::Block;
use crate::error::SyncError;
use crate::transaction::Transaction;

pub use client::HttpPeerClient;

/// Body of `POST /broadcast-block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnvelope {
    pub block: Block,
}

/// How a peer answered a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Accepted,
    /// 400 or 500: the peer declined the payload.
    Rejected(u16),
    /// 409: the peer's chain disagrees with ours.
    Conflict,
    Other(u16),
}

impl PeerStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            200..=299 => Self::Accepted,
            400 | 500 => Self::Rejected(code),
            409 => Self::Conflict,
            other => Self::Other(other),
        }
    }
}

/// Transport to other nodes. Each call targets exactly one peer.
pub trait PeerClient: Send + Sync {
    fn post_transaction(&self, peer: &str, tx: &Transaction) -> Result<PeerStatus, SyncError>;
    fn post_block(&self, peer: &str, block: &Block) -> Result<PeerStatus, SyncError>;
    fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, SyncError>;
}

/// Outcome of delivering one payload to one peer.
#[derive(Debug)]
pub struct Delivery {
    pub peer: String,
    pub result: Result<PeerStatus, SyncError>,
}

/// Per-peer outcomes of a broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub deliveries: Vec<Delivery>,
}

impl BroadcastReport {
    pub fn has_conflict(&self) -> bool {
        self.deliveries
            .iter()
            .any(|d| matches!(d.result, Ok(PeerStatus::Conflict)))
    }

    pub fn rejected(&self) -> impl Iterator<Item = &str> {
        self.deliveries.iter().filter_map(|d| match d.result {
            Ok(PeerStatus::Rejected(_)) => Some(d.peer.as_str()),
            _ => None,
        })
    }

    pub fn unreachable(&self) -> impl Iterator<Item = &str> {
        self.deliveries
            .iter()
            .filter(|d| d.result.is_err())
            .map(|d| d.peer.as_str())
    }

    pub fn accepted(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| matches!(d.result, Ok(PeerStatus::Accepted)))
            .count()
    }
}

/// Send to every peer independently; one failure never stops the others.
fn broadcast<F>(peers: &[String], what: &str, send: F) -> BroadcastReport
where
    F: Fn(&str) -> Result<PeerStatus, SyncError>,
{
    let mut report = BroadcastReport::default();
    for peer in peers {
        let result = send(peer);
        match &result {
            Ok(PeerStatus::Accepted) => {}
            Ok(PeerStatus::Rejected(code)) => {
                warn!("{what} declined by {peer} (status {code}), needs resolving");
            }
            Ok(PeerStatus::Conflict) => info!("{peer} reported a conflict for {what}"),
            Ok(PeerStatus::Other(code)) => warn!("unexpected status {code} from {peer} for {what}"),
            Err(err) => warn!("skipping {peer} for {what}: {err}"),
        }
        report.deliveries.push(Delivery {
            peer: peer.clone(),
            result,
        });
    }
    report
}

pub fn broadcast_transaction(
    client: &dyn PeerClient,
    peers: &[String],
    tx: &Transaction,
) -> BroadcastReport {
    broadcast(peers, "transaction", |peer| client.post_transaction(peer, tx))
}

pub fn broadcast_block(client: &dyn PeerClient, peers: &[String], block: &Block) -> BroadcastReport {
    broadcast(peers, "block", |peer| client.post_block(peer, block))
}

/// Fetch every peer's chain, skipping peers that fail or send garbage.
pub fn fetch_chains(client: &dyn PeerClient, peers: &[String]) -> Vec<Vec<Block>> {
    peers
        .iter()
        .filter_map(|peer| match client.fetch_chain(peer) {
            Ok(chain) => Some(chain),
            Err(err) => {
                warn!("skipping chain of {peer}: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted peers: fixed answers per peer, plus a log of what was sent.
    #[derive(Default)]
    pub struct MockPeers {
        pub tx_status: HashMap<String, u16>,
        pub block_status: HashMap<String, u16>,
        pub chains: HashMap<String, Vec<Block>>,
        pub sent_transactions: Mutex<Vec<(String, Transaction)>>,
        pub sent_blocks: Mutex<Vec<(String, Block)>>,
    }

    impl PeerClient for MockPeers {
        fn post_transaction(&self, peer: &str, tx: &Transaction) -> Result<PeerStatus, SyncError> {
            let code = *self.tx_status.get(peer).ok_or(SyncError::Status(503))?;
            self.sent_transactions
                .lock()
                .unwrap()
                .push((peer.to_string(), tx.clone()));
            Ok(PeerStatus::from_code(code))
        }

        fn post_block(&self, peer: &str, block: &Block) -> Result<PeerStatus, SyncError> {
            let code = *self.block_status.get(peer).ok_or(SyncError::Status(503))?;
            self.sent_blocks
                .lock()
                .unwrap()
                .push((peer.to_string(), block.clone()));
            Ok(PeerStatus::from_code(code))
        }

        fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, SyncError> {
            self.chains
                .get(peer)
                .cloned()
                .ok_or_else(|| SyncError::Decode(format!("no chain for {peer}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockPeers;
    use super::*;
    use crate::blockchain::testing::valid_chain;

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn status_codes_map_to_outcomes() {
        assert_eq!(PeerStatus::from_code(201), PeerStatus::Accepted);
        assert_eq!(PeerStatus::from_code(400), PeerStatus::Rejected(400));
        assert_eq!(PeerStatus::from_code(500), PeerStatus::Rejected(500));
        assert_eq!(PeerStatus::from_code(409), PeerStatus::Conflict);
        assert_eq!(PeerStatus::from_code(404), PeerStatus::Other(404));
    }

    #[test]
    fn broadcast_reaches_every_peer_despite_failures() {
        let mut mock = MockPeers::default();
        mock.tx_status.insert("a".into(), 201);
        mock.tx_status.insert("c".into(), 500);
        mock.tx_status.insert("d".into(), 201);

        let tx = Transaction::new("x", "y", "s", 1);
        let report = broadcast_transaction(&mock, &peers(&["a", "b", "c", "d"]), &tx);

        assert_eq!(report.deliveries.len(), 4);
        assert_eq!(report.accepted(), 2);
        assert_eq!(report.unreachable().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(report.rejected().collect::<Vec<_>>(), vec!["c"]);
        assert!(!report.has_conflict());
        assert_eq!(mock.sent_transactions.lock().unwrap().len(), 3);
    }

    #[test]
    fn block_conflict_is_reported() {
        let mut mock = MockPeers::default();
        mock.block_status.insert("a".into(), 201);
        mock.block_status.insert("b".into(), 409);

        let block = valid_chain(2).pop().unwrap();
        let report = broadcast_block(&mock, &peers(&["a", "b"]), &block);
        assert!(report.has_conflict());
    }

    #[test]
    fn fetch_skips_failing_peers() {
        let mut mock = MockPeers::default();
        mock.chains.insert("a".into(), valid_chain(3));
        let chains = fetch_chains(&mock, &peers(&["a", "missing"]));
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 3);
    }

    #[test]
    fn block_envelope_wire_shape() {
        let block = Block::genesis();
        let json = serde_json::to_value(BlockEnvelope { block }).unwrap();
        assert_eq!(json["block"]["index"], 0);
        assert_eq!(json["block"]["proof"], 100);
        assert_eq!(json["block"]["previous_hash"], "");
        assert!(json["block"]["transactions"].as_array().unwrap().is_empty());
    }
}

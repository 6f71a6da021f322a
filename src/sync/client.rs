use log::debug;
use reqwest::blocking::Client;
use std::time::Duration;

use super::{BlockEnvelope, PeerClient, PeerStatus};
use crate::blockchain::Block;
use crate::error::SyncError;
use crate::transaction::Transaction;

/// Plain HTTP transport using a blocking reqwest client.
///
/// Must be driven from a blocking context (e.g. `web::block`), never directly
/// from an async handler.
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn url(peer: &str, path: &str) -> String {
        if peer.contains("://") {
            format!("{}/{path}", peer.trim_end_matches('/'))
        } else {
            format!("http://{peer}/{path}")
        }
    }
}

impl PeerClient for HttpPeerClient {
    fn post_transaction(&self, peer: &str, tx: &Transaction) -> Result<PeerStatus, SyncError> {
        let url = Self::url(peer, "broadcast-transaction");
        let status = self.client.post(&url).json(tx).send()?.status();
        debug!("POST {url} -> {status}");
        Ok(PeerStatus::from_code(status.as_u16()))
    }

    fn post_block(&self, peer: &str, block: &Block) -> Result<PeerStatus, SyncError> {
        let url = Self::url(peer, "broadcast-block");
        let body = BlockEnvelope {
            block: block.clone(),
        };
        let status = self.client.post(&url).json(&body).send()?.status();
        debug!("POST {url} -> {status}");
        Ok(PeerStatus::from_code(status.as_u16()))
    }

    fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, SyncError> {
        let url = Self::url(peer, "chain");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status.as_u16()));
        }
        let body = response.bytes()?;
        serde_json::from_slice(&body).map_err(|err| SyncError::Decode(err.to_string()))
    }
}

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::blockchain::Block;
use crate::node::Node;
use crate::transaction::Transaction;
use crate::wallet::Wallet;

/// Shared application state: the node and the local wallet.
pub struct AppState {
    pub node: Node,
    wallet: Mutex<Wallet>,
}

impl AppState {
    pub fn new(node: Node, wallet: Wallet) -> Self {
        Self {
            node,
            wallet: Mutex::new(wallet),
        }
    }

    pub fn wallet(&self) -> MutexGuard<'_, Wallet> {
        self.wallet.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub block: Block,
    pub funds: i128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
}

/* ---------- TX API Models ---------- */

#[derive(Debug, Deserialize)]
pub struct NewTxRequest {
    pub recipient: String,
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTxResponse {
    pub message: String,
    pub transaction: Transaction,
    pub funds: i128,
}

/* ---------- Wallet / balance API Models ---------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub public_key: String,
    pub private_key: String,
    pub funds: i128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub participant: String,
    pub funds: i128,
}

/* ---------- Peer API Models ---------- */

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeRequest {
    pub node: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodesResponse {
    pub message: String,
    pub all_nodes: Vec<String>,
}

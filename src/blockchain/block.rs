use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::GENESIS_PROOF;
use crate::transaction::{Transaction, TxPayload};

/// A single block in the blockchain holding a list of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: i64, // Unix timestamp (UTC)
    pub transactions: Vec<Transaction>,
    pub proof: u64, // Proof-of-Work nonce
}

/// Hash preimage of a block. Fields are declared in lexicographic key order
/// and transactions are reduced to their signed payload.
#[derive(Serialize)]
struct HashableBlock<'a> {
    index: u64,
    previous_hash: &'a str,
    proof: u64,
    timestamp: i64,
    transactions: Vec<TxPayload<'a>>,
}

impl Block {
    /// The genesis block, identical on every node.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            previous_hash: String::new(),
            timestamp: 0,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
        }
    }

    /// Create a block stamped with the current time.
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>, proof: u64) -> Self {
        Self {
            index,
            previous_hash,
            timestamp: Utc::now().timestamp(),
            transactions,
            proof,
        }
    }

    /// Canonical JSON used as the hash preimage.
    pub fn canonical_json(&self) -> String {
        let hashable = HashableBlock {
            index: self.index,
            previous_hash: &self.previous_hash,
            proof: self.proof,
            timestamp: self.timestamp,
            transactions: self.transactions.iter().map(Transaction::payload).collect(),
        };
        serde_json::to_string(&hashable).unwrap_or_default()
    }

    /// Hex SHA-256 of the canonical encoding.
    pub fn hash(&self) -> String {
        sha256_hex(self.canonical_json().as_bytes())
    }

    /// Transactions covered by the proof: everything except the trailing reward.
    pub fn proof_transactions(&self) -> &[Transaction] {
        self.transactions
            .split_last()
            .map(|(_, rest)| rest)
            .unwrap_or_default()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

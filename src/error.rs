//! Error types shared across the node.

use thiserror::Error;

/// Why a transaction was not admitted into the open pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("insufficient funds: balance {balance}, amount {amount}")]
    InsufficientFunds { balance: i128, amount: u64 },
    #[error("invalid signature")]
    InvalidSignature,
}

/// Why mining did not produce a block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MineError {
    #[error("no public key configured for mining rewards")]
    NoIdentity,
    #[error("conflicts with peers must be resolved first")]
    ConflictsPending,
    #[error("open transaction failed signature re-verification")]
    InvalidTransaction,
    #[error("proof search cancelled")]
    Cancelled,
    #[error("chain tip changed while mining")]
    Stale,
}

/// Why a block received from a peer was not appended.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("previous hash does not match local tip")]
    HashMismatch,
    #[error("invalid proof of work")]
    InvalidProof,
}

/// Failure talking to a single peer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("peer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed peer response: {0}")]
    Decode(String),
    #[error("peer answered with status {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(test)]
    #[error("no persisted state")]
    Missing,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid key material: {0}")]
    Key(#[from] secp256k1::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wallet has no keys")]
    NoKeys,
    #[error("malformed wallet file")]
    Malformed,
}

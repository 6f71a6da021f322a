use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::MINING_SENDER;

/// A value transfer from `sender` to `recipient`.
///
/// `sender` is the hex-encoded compressed public key of the payer, or
/// [`MINING_SENDER`] for block rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    /// Hex-encoded DER ECDSA signature (empty for rewards)
    pub signature: String,
}

/// The signed part of a transaction. Field order is the canonical key order.
#[derive(Debug, Serialize)]
pub struct TxPayload<'a> {
    pub sender: &'a str,
    pub recipient: &'a str,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: &str, recipient: &str, signature: &str, amount: u64) -> Self {
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            signature: signature.to_string(),
        }
    }

    /// Reward transaction crediting `recipient` (no signature).
    pub fn reward(recipient: &str, amount: u64) -> Self {
        Self::new(MINING_SENDER, recipient, "", amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == MINING_SENDER
    }

    pub fn payload(&self) -> TxPayload<'_> {
        TxPayload {
            sender: &self.sender,
            recipient: &self.recipient,
            amount: self.amount,
        }
    }

    /// Canonical signing payload: `{"sender":..,"recipient":..,"amount":..}`.
    /// The signature is excluded so the payload does not depend on it.
    pub fn signing_payload(&self) -> Vec<u8> {
        signing_payload(&self.sender, &self.recipient, self.amount)
    }

    /// SHA-256 of the signing payload.
    pub fn sighash(&self) -> [u8; 32] {
        sighash(&self.sender, &self.recipient, self.amount)
    }
}

pub fn signing_payload(sender: &str, recipient: &str, amount: u64) -> Vec<u8> {
    let payload = TxPayload {
        sender,
        recipient,
        amount,
    };
    // Serializing a struct of strings and an integer cannot fail.
    serde_json::to_vec(&payload).unwrap_or_default()
}

pub fn sighash(sender: &str, recipient: &str, amount: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(signing_payload(sender, recipient, amount));
    hasher.finalize().into()
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::DIFFICULTY_PREFIX;
use super::block::sha256_hex;
use crate::transaction::{Transaction, TxPayload};

/// Shared flag used to stop a running proof search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Whether both handles share one flag.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Hash input for a proof guess: canonical transaction list, last hash, proof.
fn guess(transactions: &[Transaction], last_hash: &str, proof: u64) -> String {
    let payloads: Vec<TxPayload<'_>> = transactions.iter().map(Transaction::payload).collect();
    let txs = serde_json::to_string(&payloads).unwrap_or_default();
    format!("{txs}{last_hash}{proof}")
}

/// A proof is valid when the guess hash starts with two zero hex digits.
pub fn valid_proof(transactions: &[Transaction], last_hash: &str, proof: u64) -> bool {
    sha256_hex(guess(transactions, last_hash, proof).as_bytes()).starts_with(DIFFICULTY_PREFIX)
}

/// Search proofs 0, 1, 2, ... until one is valid.
#[cfg(test)]
pub fn find_proof(transactions: &[Transaction], last_hash: &str) -> u64 {
    let mut proof = 0u64;
    while !valid_proof(transactions, last_hash, proof) {
        proof = proof.wrapping_add(1);
    }
    proof
}

/// Search proofs 0, 1, 2, ... until one is valid, checking `cancel` before
/// every attempt.
pub fn find_proof_cancellable(
    transactions: &[Transaction],
    last_hash: &str,
    cancel: &CancelToken,
) -> Option<u64> {
    let mut proof = 0u64;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        if valid_proof(transactions, last_hash, proof) {
            return Some(proof);
        }
        proof = proof.wrapping_add(1);
    }
}

//! A running node: the ledger engine behind a single lock plus its peers.
//!
//! Every mutation of the engine happens under `ledger`. Proof search and peer
//! I/O run without the lock so admission and peer requests are not blocked
//! while a block is being mined or broadcast.

use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::blockchain::{Block, Blockchain, CancelToken};
use crate::error::{AdmissionError, BlockError, MineError};
use crate::sync::{self, BroadcastReport, PeerClient};
use crate::transaction::Transaction;

/// What happened to a block pushed to us by a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReceipt {
    /// Linked onto our tip.
    Added,
    /// Next in line but failed validation.
    Invalid(BlockError),
    /// The sender is more than one block ahead; we flagged a resolution.
    Ahead,
    /// The sender is not ahead of us.
    Behind,
}

pub struct Node {
    ledger: Mutex<Blockchain>,
    peers: Arc<dyn PeerClient>,
    mining: Mutex<Option<CancelToken>>,
}

impl Node {
    pub fn new(ledger: Blockchain, peers: Arc<dyn PeerClient>) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            peers,
            mining: Mutex::new(None),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Blockchain> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mining_slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.mining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn chain(&self) -> Vec<Block> {
        self.ledger().chain()
    }

    pub fn open_transactions(&self) -> Vec<Transaction> {
        self.ledger().open_transactions()
    }

    pub fn peers(&self) -> Vec<String> {
        self.ledger().peer_nodes()
    }

    pub fn public_key(&self) -> Option<String> {
        self.ledger().public_key().map(str::to_string)
    }

    pub fn set_identity(&self, public_key: Option<String>) {
        self.ledger().set_public_key(public_key);
    }

    pub fn resolve_conflicts(&self) -> bool {
        self.ledger().resolve_conflicts()
    }

    pub fn balance(&self, participant: &str) -> i128 {
        self.ledger().balance_of(participant)
    }

    /// Admit a transaction and, unless it came from a peer, broadcast it.
    pub fn submit_transaction(
        &self,
        sender: &str,
        recipient: &str,
        signature: &str,
        amount: u64,
        is_receiving: bool,
    ) -> Result<Transaction, AdmissionError> {
        let (tx, peers) = {
            let mut ledger = self.ledger();
            let tx = ledger.admit(sender, recipient, signature, amount)?;
            (tx, ledger.peer_nodes())
        };

        if !is_receiving && !peers.is_empty() {
            let report = sync::broadcast_transaction(self.peers.as_ref(), &peers, &tx);
            self.settle(&report, "transaction");
        }
        Ok(tx)
    }

    /// Log a broadcast's outcome and flag a resolution if any peer disagreed.
    fn settle(&self, report: &BroadcastReport, what: &str) {
        debug!(
            "{what} broadcast: {}/{} peers accepted",
            report.accepted(),
            report.deliveries.len()
        );
        let rejected: Vec<&str> = report.rejected().collect();
        if !rejected.is_empty() {
            debug!("{what} rejected by {}", rejected.join(", "));
        }
        let unreachable: Vec<&str> = report.unreachable().collect();
        if !unreachable.is_empty() {
            debug!("{what} not delivered to {}", unreachable.join(", "));
        }
        if report.has_conflict() {
            self.ledger().mark_conflict();
        }
    }

    /// Register a fresh token as the in-flight search.
    fn start_search(&self) -> CancelToken {
        let cancel = CancelToken::new();
        *self.mining_slot() = Some(cancel.clone());
        cancel
    }

    /// Clear the slot, unless a later search has already taken it over.
    fn finish_search(&self, cancel: &CancelToken) {
        let mut slot = self.mining_slot();
        if slot.as_ref().is_some_and(|current| current.same(cancel)) {
            slot.take();
        }
    }

    /// Mine the open pool into a block, commit it and broadcast it.
    pub fn mine(&self) -> Result<Block, MineError> {
        let job = {
            let ledger = self.ledger();
            if ledger.resolve_conflicts() {
                return Err(MineError::ConflictsPending);
            }
            ledger.prepare_mining()?
        };

        let cancel = self.start_search();
        let solved = job.solve(&cancel);
        self.finish_search(&cancel);
        let proof = solved.ok_or(MineError::Cancelled)?;

        let (block, peers) = {
            let mut ledger = self.ledger();
            let block = ledger.commit_mined(job, proof)?;
            (block, ledger.peer_nodes())
        };

        let report = sync::broadcast_block(self.peers.as_ref(), &peers, &block);
        self.settle(&report, "block");
        Ok(block)
    }

    /// Stop an in-flight proof search, if any.
    pub fn cancel_mining(&self) {
        if let Some(token) = self.mining_slot().as_ref() {
            info!("cancelling in-flight proof search");
            token.cancel();
        }
    }

    /// Handle a block broadcast by a peer.
    pub fn receive_block(&self, block: Block) -> BlockReceipt {
        let receipt = {
            let mut ledger = self.ledger();
            let next = ledger.len() as u64;
            if block.index == next {
                match ledger.add_block(block) {
                    Ok(()) => BlockReceipt::Added,
                    Err(err) => BlockReceipt::Invalid(err),
                }
            } else if block.index > next {
                ledger.mark_conflict();
                BlockReceipt::Ahead
            } else {
                BlockReceipt::Behind
            }
        };
        if receipt == BlockReceipt::Added {
            // Our tip moved; a running search can no longer commit.
            self.cancel_mining();
        }
        receipt
    }

    /// Adopt the longest valid peer chain. Returns whether ours was replaced.
    pub fn resolve(&self) -> bool {
        let peers = self.peers();
        let candidates = sync::fetch_chains(self.peers.as_ref(), &peers);
        let replaced = self.ledger().replace_chain(candidates);
        if replaced {
            self.cancel_mining();
        }
        replaced
    }

    pub fn add_peer(&self, node: &str) {
        self.ledger().add_peer_node(node);
    }

    pub fn remove_peer(&self, node: &str) {
        self.ledger().remove_peer_node(node);
    }
}

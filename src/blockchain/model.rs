use log::{debug, error, info, warn};
use std::collections::BTreeSet;

use super::ledger::balance_of;
use super::proof::{CancelToken, find_proof_cancellable, valid_proof};
use super::verification::verify_chain;
use super::{Block, MINING_REWARD};
use crate::error::{AdmissionError, BlockError, MineError};
use crate::storage::{Snapshot, Storage};
use crate::transaction::Transaction;
use crate::wallet::verify_transaction;

/// Snapshot of what a miner works on: the tip it extends and the open
/// transactions it covers. Solving it does not need the engine.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub last_hash: String,
    pub transactions: Vec<Transaction>,
    pub reward_recipient: String,
}

impl MiningJob {
    pub fn solve(&self, cancel: &CancelToken) -> Option<u64> {
        find_proof_cancellable(&self.transactions, &self.last_hash, cancel)
    }
}

/// Ledger engine: the chain, the open transaction pool and the peer set of
/// one node. Getters hand out copies; all mutation goes through methods that
/// persist afterwards.
pub struct Blockchain {
    chain: Vec<Block>,
    open_transactions: Vec<Transaction>,
    peer_nodes: BTreeSet<String>,
    public_key: Option<String>,
    resolve_conflicts: bool,
    storage: Box<dyn Storage>,
}

impl Blockchain {
    /// Load persisted state, falling back to a fresh genesis chain.
    pub fn new(public_key: Option<String>, storage: Box<dyn Storage>) -> Self {
        let mut bc = Self {
            chain: vec![Block::genesis()],
            open_transactions: Vec::new(),
            peer_nodes: BTreeSet::new(),
            public_key,
            resolve_conflicts: false,
            storage,
        };
        bc.load_data();
        bc
    }

    fn load_data(&mut self) {
        match self.storage.load() {
            Ok(snapshot) if snapshot.chain.is_empty() => {
                warn!("persisted chain is empty, starting from genesis");
            }
            Ok(snapshot) => {
                info!(
                    "restored chain of {} blocks with {} open transactions",
                    snapshot.chain.len(),
                    snapshot.open_transactions.len()
                );
                self.chain = snapshot.chain;
                self.open_transactions = snapshot.open_transactions;
                self.peer_nodes = snapshot.peer_nodes.into_iter().collect();
            }
            Err(err) => {
                info!("no usable persisted state ({err}), starting from genesis");
            }
        }
    }

    /// Persist current state. Failures are logged; the in-memory state stays.
    fn save_data(&mut self) {
        let snapshot = Snapshot {
            chain: self.chain.clone(),
            open_transactions: self.open_transactions.clone(),
            peer_nodes: self.peer_nodes(),
        };
        if let Err(err) = self.storage.save(&snapshot) {
            error!("saving state failed: {err}");
        }
    }

    pub fn chain(&self) -> Vec<Block> {
        self.chain.clone()
    }

    pub fn open_transactions(&self) -> Vec<Transaction> {
        self.open_transactions.clone()
    }

    pub fn peer_nodes(&self) -> Vec<String> {
        self.peer_nodes.iter().cloned().collect()
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn set_public_key(&mut self, public_key: Option<String>) {
        self.public_key = public_key;
    }

    pub fn resolve_conflicts(&self) -> bool {
        self.resolve_conflicts
    }

    pub fn mark_conflict(&mut self) {
        self.resolve_conflicts = true;
    }

    pub fn balance_of(&self, participant: &str) -> i128 {
        balance_of(&self.chain, &self.open_transactions, participant)
    }

    /// Admit a transaction into the open pool if the sender can cover it and
    /// the signature verifies. Nothing changes on rejection.
    pub fn admit(
        &mut self,
        sender: &str,
        recipient: &str,
        signature: &str,
        amount: u64,
    ) -> Result<Transaction, AdmissionError> {
        let tx = Transaction::new(sender, recipient, signature, amount);
        // Rewards only enter the chain through mining.
        if tx.is_reward() {
            return Err(AdmissionError::InvalidSignature);
        }

        let balance = self.balance_of(sender);
        if balance < i128::from(amount) {
            return Err(AdmissionError::InsufficientFunds { balance, amount });
        }
        if !verify_transaction(&tx) {
            return Err(AdmissionError::InvalidSignature);
        }

        self.open_transactions.push(tx.clone());
        debug!(
            "admitted {} -> {} ({}), pool size {}",
            tx.sender,
            tx.recipient,
            tx.amount,
            self.open_transactions.len()
        );
        self.save_data();
        Ok(tx)
    }

    /// Snapshot the tip and the pool for a proof search.
    pub fn prepare_mining(&self) -> Result<MiningJob, MineError> {
        let reward_recipient = self.public_key.clone().ok_or(MineError::NoIdentity)?;
        Ok(MiningJob {
            index: self.chain.len() as u64,
            last_hash: self.last_block().hash(),
            transactions: self.open_transactions.clone(),
            reward_recipient,
        })
    }

    /// Turn a solved job into a block on top of the chain.
    pub fn commit_mined(&mut self, job: MiningJob, proof: u64) -> Result<Block, MineError> {
        if job.index != self.chain.len() as u64 || job.last_hash != self.last_block().hash() {
            return Err(MineError::Stale);
        }
        if !job.transactions.iter().all(verify_transaction) {
            warn!("MINER - open transaction failed re-verification, block discarded");
            return Err(MineError::InvalidTransaction);
        }

        let mut transactions = job.transactions;
        transactions.push(Transaction::reward(&job.reward_recipient, MINING_REWARD));
        let block = Block::new(job.index, job.last_hash, transactions, proof);

        self.chain.push(block.clone());
        self.remove_mined(&block.transactions);
        self.save_data();
        info!(
            "MINER - sealed block #{} (proof={}, txs={})",
            block.index,
            block.proof,
            block.transactions.len()
        );
        Ok(block)
    }

    /// Prepare, solve and commit in one go.
    #[cfg(test)]
    pub fn mine_block(&mut self, cancel: &CancelToken) -> Result<Block, MineError> {
        let job = self.prepare_mining()?;
        let proof = job.solve(cancel).ok_or(MineError::Cancelled)?;
        self.commit_mined(job, proof)
    }

    /// Append a block received from a peer on top of the local tip.
    pub fn add_block(&mut self, block: Block) -> Result<(), BlockError> {
        if block.previous_hash != self.last_block().hash() {
            return Err(BlockError::HashMismatch);
        }
        if !valid_proof(block.proof_transactions(), &block.previous_hash, block.proof) {
            return Err(BlockError::InvalidProof);
        }

        self.remove_mined(&block.transactions);
        self.chain.push(block);
        self.save_data();
        Ok(())
    }

    /// Drop open transactions that are now part of a block.
    fn remove_mined(&mut self, mined: &[Transaction]) {
        for tx in mined {
            if let Some(pos) = self.open_transactions.iter().position(|open| open == tx) {
                self.open_transactions.remove(pos);
            }
        }
    }

    /// Adopt the longest valid candidate if it beats the local chain. A
    /// candidate must start from our genesis block. The pool is discarded on
    /// replacement and the conflict flag is always cleared.
    pub fn replace_chain<I>(&mut self, candidates: I) -> bool
    where
        I: IntoIterator<Item = Vec<Block>>,
    {
        let genesis = Block::genesis();
        let mut winner: Option<Vec<Block>> = None;
        let mut best_len = self.chain.len();
        for candidate in candidates {
            if candidate.first() != Some(&genesis) {
                debug!("ignoring peer chain with a foreign genesis block");
                continue;
            }
            if candidate.len() > best_len && verify_chain(&candidate) {
                best_len = candidate.len();
                winner = Some(candidate);
            }
        }

        self.resolve_conflicts = false;
        let replaced = match winner {
            Some(chain) => {
                info!("replacing local chain with peer chain of {} blocks", chain.len());
                self.chain = chain;
                self.open_transactions.clear();
                true
            }
            None => false,
        };
        self.save_data();
        replaced
    }

    pub fn add_peer_node(&mut self, node: &str) {
        self.peer_nodes.insert(node.to_string());
        self.save_data();
    }

    pub fn remove_peer_node(&mut self, node: &str) {
        self.peer_nodes.remove(node);
        self.save_data();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::GENESIS_PROOF;
    use crate::blockchain::proof::find_proof;
    use crate::blockchain::testing::valid_chain;
    use crate::storage::MemoryStorage;
    use crate::wallet::{generate_keypair_hex, sign_transaction};

    fn engine(public_key: Option<String>) -> (Blockchain, MemoryStorage) {
        let storage = MemoryStorage::new();
        (Blockchain::new(public_key, Box::new(storage.clone())), storage)
    }

    /// Miner with one reward already on chain.
    fn funded() -> (Blockchain, MemoryStorage, String, String) {
        let (sk, pk) = generate_keypair_hex();
        let (mut bc, storage) = engine(Some(pk.clone()));
        bc.mine_block(&CancelToken::new()).unwrap();
        (bc, storage, sk, pk)
    }

    #[test]
    fn starts_from_genesis_without_state() {
        let (bc, _) = engine(None);
        assert_eq!(bc.chain(), vec![Block::genesis()]);
        assert!(bc.open_transactions().is_empty());
        assert!(bc.peer_nodes().is_empty());
        assert_eq!(bc.balance_of("anyone"), 0);
    }

    #[test]
    fn restores_persisted_state() {
        let snapshot = Snapshot {
            chain: valid_chain(3),
            open_transactions: vec![Transaction::new("a", "b", "s", 1)],
            peer_nodes: vec!["localhost:5001".into(), "localhost:5001".into()],
        };
        let bc = Blockchain::new(None, Box::new(MemoryStorage::with_snapshot(snapshot)));
        assert_eq!(bc.len(), 3);
        assert_eq!(bc.open_transactions().len(), 1);
        assert_eq!(bc.peer_nodes(), vec!["localhost:5001".to_string()]);
    }

    #[test]
    fn empty_persisted_chain_falls_back_to_genesis() {
        let storage = MemoryStorage::with_snapshot(Snapshot::default());
        let bc = Blockchain::new(None, Box::new(storage));
        assert_eq!(bc.chain(), vec![Block::genesis()]);
    }

    #[test]
    fn mining_without_identity_is_refused() {
        let (mut bc, _) = engine(None);
        assert_eq!(bc.mine_block(&CancelToken::new()), Err(MineError::NoIdentity));
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn admission_rejects_insufficient_funds() {
        let (sk, pk) = generate_keypair_hex();
        let (mut bc, _) = engine(None);
        let sig = sign_transaction(&sk, &pk, "bob", 5).unwrap();
        assert_eq!(
            bc.admit(&pk, "bob", &sig, 5),
            Err(AdmissionError::InsufficientFunds { balance: 0, amount: 5 })
        );
        assert!(bc.open_transactions().is_empty());
    }

    #[test]
    fn admission_rejects_bad_signature() {
        let (mut bc, _, sk, pk) = funded();
        let sig = sign_transaction(&sk, &pk, "bob", 4).unwrap();
        assert_eq!(bc.admit(&pk, "bob", &sig, 5), Err(AdmissionError::InvalidSignature));
        assert!(bc.open_transactions().is_empty());
    }

    #[test]
    fn admission_rejects_reward_sender() {
        let (mut bc, _, _, _) = funded();
        assert_eq!(
            bc.admit("MINING", "bob", "", 0),
            Err(AdmissionError::InvalidSignature)
        );
    }

    #[test]
    fn admission_moves_balances() {
        let (mut bc, storage, sk, pk) = funded();
        assert_eq!(bc.balance_of(&pk), 10);

        let sig = sign_transaction(&sk, &pk, "bob", 4).unwrap();
        bc.admit(&pk, "bob", &sig, 4).unwrap();
        assert_eq!(bc.balance_of(&pk), 6);
        assert_eq!(bc.open_transactions().len(), 1);
        assert_eq!(storage.saved().unwrap().open_transactions.len(), 1);

        // Pending spends count against the sender.
        let sig = sign_transaction(&sk, &pk, "bob", 7).unwrap();
        assert!(matches!(
            bc.admit(&pk, "bob", &sig, 7),
            Err(AdmissionError::InsufficientFunds { balance: 6, amount: 7 })
        ));
    }

    #[test]
    fn end_to_end_mining() {
        let (mut bc, storage, sk, pk) = funded();
        let sig = sign_transaction(&sk, &pk, "bob", 5).unwrap();
        bc.admit(&pk, "bob", &sig, 5).unwrap();
        assert_eq!(bc.open_transactions().len(), 1);

        let block = bc.mine_block(&CancelToken::new()).unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].recipient, "bob");
        let reward = &block.transactions[1];
        assert!(reward.is_reward());
        assert_eq!(reward.recipient, pk);
        assert_eq!(reward.amount, MINING_REWARD);

        assert!(bc.open_transactions().is_empty());
        assert_eq!(bc.len(), 3);
        assert!(verify_chain(&bc.chain()));
        assert_eq!(bc.balance_of(&pk), 15);
        assert_eq!(bc.balance_of("bob"), 5);
        assert_eq!(storage.saved().unwrap().chain.len(), 3);
    }

    #[test]
    fn commit_keeps_transactions_admitted_mid_search() {
        let (mut bc, _, sk, pk) = funded();
        let sig = sign_transaction(&sk, &pk, "bob", 2).unwrap();
        bc.admit(&pk, "bob", &sig, 2).unwrap();

        let job = bc.prepare_mining().unwrap();
        let proof = job.solve(&CancelToken::new()).unwrap();

        let sig = sign_transaction(&sk, &pk, "carol", 3).unwrap();
        bc.admit(&pk, "carol", &sig, 3).unwrap();

        let block = bc.commit_mined(job, proof).unwrap();
        assert_eq!(block.transactions.len(), 2);
        let pool = bc.open_transactions();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].recipient, "carol");
    }

    #[test]
    fn commit_on_moved_tip_is_stale() {
        let (mut bc, _, _, _) = funded();
        let job = bc.prepare_mining().unwrap();
        let proof = job.solve(&CancelToken::new()).unwrap();
        bc.mine_block(&CancelToken::new()).unwrap();
        assert_eq!(bc.commit_mined(job, proof), Err(MineError::Stale));
    }

    #[test]
    fn forged_pool_entry_aborts_mining() {
        let (mut bc, _, _, pk) = funded();
        let mut job = bc.prepare_mining().unwrap();
        job.transactions.push(Transaction::new(&pk, "bob", "3045", 1));
        let proof = job.solve(&CancelToken::new()).unwrap();
        assert_eq!(bc.commit_mined(job, proof), Err(MineError::InvalidTransaction));
        assert_eq!(bc.len(), 2);
    }

    #[test]
    fn cancelled_mining_commits_nothing() {
        let (mut bc, _, _, _) = funded();
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(bc.mine_block(&token), Err(MineError::Cancelled));
        assert_eq!(bc.len(), 2);
    }

    #[test]
    fn add_block_appends_and_prunes_pool() {
        let (sk, pk) = generate_keypair_hex();
        let (mut miner, _) = engine(Some(pk.clone()));
        let (mut follower, _) = engine(None);

        let first = miner.mine_block(&CancelToken::new()).unwrap();
        follower.add_block(first).unwrap();

        let sig = sign_transaction(&sk, &pk, "bob", 3).unwrap();
        miner.admit(&pk, "bob", &sig, 3).unwrap();
        follower.admit(&pk, "bob", &sig, 3).unwrap();
        assert_eq!(follower.open_transactions().len(), 1);

        let second = miner.mine_block(&CancelToken::new()).unwrap();
        follower.add_block(second).unwrap();
        assert!(follower.open_transactions().is_empty());
        assert_eq!(follower.chain(), miner.chain());
    }

    #[test]
    fn add_block_rejects_bad_linkage_and_proof() {
        let (mut bc, _) = engine(None);
        let chain = valid_chain(3);

        assert_eq!(bc.add_block(chain[2].clone()), Err(BlockError::HashMismatch));

        let mut bad = chain[1].clone();
        let txs = bad.proof_transactions().to_vec();
        let prev_hash = bad.previous_hash.clone();
        bad.proof = (0u64..)
            .find(|p| !valid_proof(&txs, &prev_hash, *p))
            .unwrap();
        assert_eq!(bc.add_block(bad), Err(BlockError::InvalidProof));

        bc.add_block(chain[1].clone()).unwrap();
        assert_eq!(bc.len(), 2);
    }

    #[test]
    fn longer_valid_chain_replaces_local() {
        let (mut bc, _, sk, pk) = funded();
        let sig = sign_transaction(&sk, &pk, "bob", 1).unwrap();
        bc.admit(&pk, "bob", &sig, 1).unwrap();
        bc.mark_conflict();

        let peer_chain = valid_chain(5);
        assert!(bc.replace_chain(vec![valid_chain(1), peer_chain.clone()]));
        assert_eq!(bc.len(), 5);
        assert_eq!(bc.chain(), peer_chain);
        assert!(bc.open_transactions().is_empty());
        assert!(!bc.resolve_conflicts());
    }

    #[test]
    fn shorter_or_invalid_chain_is_ignored() {
        let (mut bc, _, _, _) = funded();
        let before = bc.chain();
        bc.mark_conflict();

        let mut forged = valid_chain(6);
        forged[3].previous_hash = "00".into();
        assert!(!bc.replace_chain(vec![valid_chain(1), valid_chain(2), forged]));
        assert_eq!(bc.chain(), before);
        assert!(!bc.resolve_conflicts());
    }

    #[test]
    fn chain_with_foreign_genesis_is_ignored() {
        let (mut bc, _) = engine(None);

        let mut forged = vec![Block::new(
            0,
            String::new(),
            vec![Transaction::reward("attacker", 1_000_000)],
            GENESIS_PROOF,
        )];
        for i in 1..3u64 {
            let prev_hash = forged[i as usize - 1].hash();
            let mut txs = Vec::new();
            let proof = find_proof(&txs, &prev_hash);
            txs.push(Transaction::reward("attacker", MINING_REWARD));
            forged.push(Block::new(i, prev_hash, txs, proof));
        }
        assert!(verify_chain(&forged));

        assert!(!bc.replace_chain(vec![forged]));
        assert_eq!(bc.chain(), vec![Block::genesis()]);
        assert_eq!(bc.balance_of("attacker"), 0);
    }

    #[test]
    fn chain_with_gapped_tip_index_is_ignored() {
        let (mut bc, _) = engine(None);
        let mut peer_chain = valid_chain(3);
        peer_chain[2].index = u64::MAX;
        assert!(!bc.replace_chain(vec![peer_chain]));
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn peers_are_deduplicated() {
        let (mut bc, storage) = engine(None);
        bc.add_peer_node("localhost:5001");
        bc.add_peer_node("localhost:5001");
        bc.add_peer_node("localhost:5002");
        assert_eq!(bc.peer_nodes().len(), 2);
        bc.remove_peer_node("localhost:5001");
        bc.remove_peer_node("unknown");
        assert_eq!(bc.peer_nodes(), vec!["localhost:5002".to_string()]);
        assert_eq!(storage.saved().unwrap().peer_nodes, vec!["localhost:5002".to_string()]);
    }
}

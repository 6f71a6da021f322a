use super::Block;
use super::proof::find_proof;
use crate::transaction::Transaction;

/// Build a valid chain of `len` blocks (genesis included), each mined block
/// holding one transfer followed by a reward.
pub fn valid_chain(len: usize) -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    for i in 1..len {
        let prev_hash = chain[i - 1].hash();
        let mut txs = vec![Transaction::new("alice", "bob", "sig", i as u64)];
        let proof = find_proof(&txs, &prev_hash);
        txs.push(Transaction::reward("miner", 10));
        chain.push(Block::new(i as u64, prev_hash, txs, proof));
    }
    chain
}

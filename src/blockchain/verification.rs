use log::debug;

use super::Block;
use super::proof::valid_proof;

/// Replay a whole chain. Indices must run 0..N-1; past that the genesis
/// block is not checked.
pub fn verify_chain(chain: &[Block]) -> bool {
    if let Some((i, block)) = chain
        .iter()
        .enumerate()
        .find(|(i, block)| block.index != *i as u64)
    {
        debug!("chain invalid: block at height {i} carries index {}", block.index);
        return false;
    }
    for (i, pair) in chain.windows(2).enumerate() {
        let (previous, block) = (&pair[0], &pair[1]);
        if block.previous_hash != previous.hash() {
            debug!("chain invalid: block {} does not link to its predecessor", i + 1);
            return false;
        }
        if !valid_proof(block.proof_transactions(), &block.previous_hash, block.proof) {
            debug!("chain invalid: proof of work of block {} is invalid", i + 1);
            return false;
        }
    }
    true
}

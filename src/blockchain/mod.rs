pub mod block;
pub mod ledger;
pub mod model;
pub mod proof;
pub mod verification;

#[cfg(test)]
pub(crate) mod testing;

pub use block::Block;
pub use model::Blockchain;
pub use proof::CancelToken;

/// Fixed Proof-of-Work target: guess hashes must start with this prefix.
pub const DIFFICULTY_PREFIX: &str = "00";

/// Reward credited to the miner of each block.
pub const MINING_REWARD: u64 = 10;

/// Proof stored in the genesis block.
pub const GENESIS_PROOF: u64 = 100;

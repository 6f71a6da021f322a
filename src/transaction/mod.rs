pub mod model;

pub use model::{Transaction, TxPayload};

/// Sender used by block reward transactions.
pub const MINING_SENDER: &str = "MINING";

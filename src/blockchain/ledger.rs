use super::Block;
use crate::transaction::Transaction;

/// Balance of `participant`: everything received in the chain minus everything
/// sent in the chain and in the open pool. No clamping.
pub fn balance_of(chain: &[Block], open_transactions: &[Transaction], participant: &str) -> i128 {
    let committed = chain.iter().flat_map(|b| b.transactions.iter());

    let received: i128 = committed
        .clone()
        .filter(|tx| tx.recipient == participant)
        .map(|tx| i128::from(tx.amount))
        .sum();

    let sent: i128 = committed
        .chain(open_transactions.iter())
        .filter(|tx| tx.sender == participant)
        .map(|tx| i128::from(tx.amount))
        .sum();

    received - sent
}

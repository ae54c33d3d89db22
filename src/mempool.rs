//! The mempool: pending transactions not yet mined into a block.

use std::collections::HashMap;

use crate::blockchain::chain::Blockchain;
use crate::transaction::Transaction;

#[derive(Default)]
pub struct Mempool {
    transactions: HashMap<u128, Transaction>,
}

impl Mempool {
    pub fn new() -> Mempool {
        Mempool {
            transactions: HashMap::new(),
        }
    }

    /// Insert or replace a transaction by its uuid.
    pub fn add(&mut self, transaction: Transaction) {
        self.transactions.insert(transaction.uuid, transaction);
    }

    /// Find the caller's single pending transaction by sender address, if
    /// any — a sender is expected to have at most one open transaction in
    /// the pool at a time.
    pub fn get_by_sender(&self, address: &str) -> Option<&Transaction> {
        self.transactions
            .values()
            .find(|tx| tx.input.address == address)
    }

    pub fn get_by_sender_mut(&mut self, address: &str) -> Option<&mut Transaction> {
        self.transactions
            .values_mut()
            .find(|tx| tx.input.address == address)
    }

    /// All pending transactions, in arbitrary order.
    pub fn data(&self) -> Vec<Transaction> {
        self.transactions.values().cloned().collect()
    }

    /// Drop every pending transaction whose uuid has already been mined
    /// into `chain`.
    pub fn clear_against(&mut self, chain: &Blockchain) {
        let mined: std::collections::HashSet<u128> = chain
            .chain
            .iter()
            .flat_map(|block| block.data.iter())
            .map(|tx| tx.uuid)
            .collect();
        self.transactions.retain(|uuid, _| !mined.contains(uuid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    #[test]
    fn add_then_get_by_sender() {
        let mut pool = Mempool::new();
        let miner = Wallet::new().unwrap();
        let tx = Transaction::reward_mining(&miner);
        let addr = tx.input.address.clone();
        pool.add(tx);
        assert!(pool.get_by_sender(&addr).is_some());
    }

    #[test]
    fn clear_against_drops_mined_transactions() {
        let mut pool = Mempool::new();
        let miner = Wallet::new().unwrap();
        let tx = Transaction::reward_mining(&miner);
        let uuid = tx.uuid;
        pool.add(tx.clone());

        let mut chain = Blockchain::new();
        chain.add_block(vec![tx]).unwrap();

        pool.clear_against(&chain);
        assert!(pool.data().iter().all(|t| t.uuid != uuid));
    }

    #[test]
    fn data_returns_all_pending() {
        let mut pool = Mempool::new();
        let miner = Wallet::new().unwrap();
        pool.add(Transaction::reward_mining(&miner));
        pool.add(Transaction::reward_mining(&miner));
        assert_eq!(pool.data().len(), 2);
    }
}

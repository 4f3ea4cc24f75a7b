//! Pending transaction pool.
//!
//! The pool is strictly ordered by admission. Mining takes a snapshot of the
//! current contents and, on commit, removes exactly that prefix so anything
//! admitted during the search stays queued for the next block.

use crate::address::Address;
use crate::transaction::{Amount, Transaction};

#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Removes the first `count` transactions, i.e. the ones captured by a
    /// mining snapshot of that length.
    pub fn drain_front(&mut self, count: usize) -> Vec<Transaction> {
        let count = count.min(self.transactions.len());
        self.transactions.drain(..count).collect()
    }

    /// Sum of amounts `address` is already spending in pending transactions.
    pub fn pending_debits(&self, address: &Address) -> Amount {
        self.transactions
            .iter()
            .filter(|tx| tx.sender.is(address))
            .fold(Amount::ZERO, |acc, tx| acc.saturating_add(tx.amount))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

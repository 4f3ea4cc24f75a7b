use crate::address::Address;
use crate::transaction::{Amount, Sender, Transaction};
use std::collections::HashMap;

use super::chain::Block;

/// Balance of `address` replayed from the start of `blocks`: credits where it
/// is the recipient, debits where it is the sender.
pub fn balance_of(blocks: &[Block], address: &Address) -> Amount {
    blocks
        .iter()
        .flat_map(|block| block.transactions.iter())
        .fold(Amount::ZERO, |balance, tx| {
            let mut balance = balance;
            if &tx.recipient == address {
                balance = balance.saturating_add(tx.amount);
            }
            if tx.sender.is(address) {
                balance = balance.saturating_sub(tx.amount);
            }
            balance
        })
}

/// Every account's balance derived from a chain, plus what the system
/// sender has issued.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AccountState {
    pub address_balances: HashMap<Address, Amount>,
    pub issued: Amount,
}

impl AccountState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chain(blocks: &[Block]) -> Self {
        let mut state = Self::new();
        for block in blocks {
            state.apply_block(block);
        }
        state
    }

    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.apply_transaction(tx);
        }
    }

    pub fn apply_transaction(&mut self, tx: &Transaction) {
        match &tx.sender {
            Sender::System => self.issued = self.issued.saturating_add(tx.amount),
            Sender::Account(sender) => {
                let balance = self.address_balances.entry(sender.clone()).or_default();
                *balance = balance.saturating_sub(tx.amount);
            }
        }
        let balance = self.address_balances.entry(tx.recipient.clone()).or_default();
        *balance = balance.saturating_add(tx.amount);
    }

    pub fn get_balance(&self, address: &Address) -> Amount {
        self.address_balances.get(address).copied().unwrap_or_default()
    }

    /// Sum over all account balances. Equals `issued` on any chain built
    /// through admission.
    pub fn total_balance(&self) -> Amount {
        self.address_balances
            .values()
            .fold(Amount::ZERO, |acc, balance| acc.saturating_add(*balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Identity;

    fn coins(value: f64) -> Amount {
        Amount::from_coins(value).unwrap()
    }

    #[test]
    fn test_balance_of_folds_credits_and_debits() {
        let alice = Identity::generate().unwrap();
        let bob = Identity::generate().unwrap();

        let blocks = vec![
            Block::genesis(),
            Block::new(1, [0u8; 32], vec![Transaction::reward(alice.address().clone(), coins(1.0))]),
            Block::new(
                2,
                [0u8; 32],
                vec![
                    Transaction::new(alice.address().clone(), bob.address().clone(), coins(0.4))
                        .unwrap(),
                    Transaction::reward(alice.address().clone(), coins(1.0)),
                ],
            ),
        ];

        assert_eq!(balance_of(&blocks, alice.address()), coins(1.6));
        assert_eq!(balance_of(&blocks, bob.address()), coins(0.4));
        assert_eq!(balance_of(&blocks[..2], bob.address()), Amount::ZERO);
    }

    #[test]
    fn test_unknown_address_has_zero_balance() {
        let stranger = Identity::generate().unwrap();
        assert_eq!(balance_of(&[Block::genesis()], stranger.address()), Amount::ZERO);
        assert_eq!(AccountState::new().get_balance(stranger.address()), Amount::ZERO);
    }

    #[test]
    fn test_account_state_conserves_issued_supply() {
        let alice = Identity::generate().unwrap();
        let bob = Identity::generate().unwrap();
        let blocks = vec![
            Block::new(1, [0u8; 32], vec![Transaction::reward(alice.address().clone(), coins(2.0))]),
            Block::new(
                2,
                [0u8; 32],
                vec![
                    Transaction::new(alice.address().clone(), bob.address().clone(), coins(0.75))
                        .unwrap(),
                    Transaction::reward(bob.address().clone(), coins(1.0)),
                ],
            ),
        ];

        let state = AccountState::from_chain(&blocks);
        assert_eq!(state.issued, coins(3.0));
        assert_eq!(state.total_balance(), state.issued);
        assert_eq!(state.get_balance(alice.address()), balance_of(&blocks, alice.address()));
        assert_eq!(state.get_balance(bob.address()), coins(1.75));
    }
}

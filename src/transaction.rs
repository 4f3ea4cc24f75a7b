//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::TransactionRequest;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::crypto::Identity;
    use crate::error::ChainError;

    fn address() -> Address {
        Identity::generate().unwrap().address().clone()
    }

    #[test]
    fn test_canonical_bytes_are_stable() {
        let tx = Transaction::new(address(), address(), Amount::from_coins(0.4).unwrap()).unwrap();
        assert_eq!(tx.canonical_bytes(), tx.clone().canonical_bytes());
        assert_eq!(tx.hash(), tx.hash());
    }

    #[test]
    fn test_canonical_bytes_layout() {
        let sender = address();
        let recipient = address();
        let tx = Transaction::new(sender.clone(), recipient.clone(), Amount::from_units(7)).unwrap();
        let bytes = tx.canonical_bytes();

        let mut expected = b"TX:".to_vec();
        expected.extend_from_slice(&(sender.as_str().len() as u32).to_le_bytes());
        expected.extend_from_slice(sender.as_str().as_bytes());
        expected.extend_from_slice(&(recipient.as_str().len() as u32).to_le_bytes());
        expected.extend_from_slice(recipient.as_str().as_bytes());
        expected.extend_from_slice(&7i64.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_hash_changes_with_each_field() {
        let a = address();
        let b = address();
        let base = Transaction::new(a.clone(), b.clone(), Amount::from_coins(1.0).unwrap()).unwrap();
        let other_amount =
            Transaction::new(a.clone(), b.clone(), Amount::from_coins(1.1).unwrap()).unwrap();
        let swapped = Transaction::new(b, a, Amount::from_coins(1.0).unwrap()).unwrap();

        assert_ne!(base.hash(), other_amount.hash());
        assert_ne!(base.hash(), swapped.hash());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = Transaction::new(address(), address(), Amount::from_units(-1));
        assert!(matches!(result, Err(ChainError::InvalidTransaction(msg)) if msg.contains("negative")));
    }

    #[test]
    fn test_reward_uses_reserved_sender() {
        let miner = address();
        let reward = Transaction::reward(miner.clone(), Amount::from_coins(1.0).unwrap());
        assert!(reward.is_reward());
        assert_eq!(reward.sender.to_string(), MINING_SENDER);
        assert_eq!(reward.recipient, miner);
    }

    #[test]
    fn test_transaction_json_shape() {
        let sender = address();
        let recipient = address();
        let tx = Transaction::new(sender.clone(), recipient.clone(), Amount::from_coins(0.4).unwrap())
            .unwrap();
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["sender"], sender.as_str());
        assert_eq!(json["recipient"], recipient.as_str());
        assert_eq!(json["amount"], 0.4);

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_reward_sender_json() {
        let reward = Transaction::reward(address(), Amount::from_coins(1.0).unwrap());
        let json = serde_json::to_value(&reward).unwrap();
        assert_eq!(json["sender"], MINING_SENDER);

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert!(back.is_reward());
    }
}

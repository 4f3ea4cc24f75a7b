use tracing::debug;

use super::chain::Block;

/// Checks that every block after the first links to its predecessor's hash
/// and that every hash-linked block, genesis excepted, is a valid proof at
/// `difficulty`. An empty chain is invalid.
pub fn is_valid_chain_at(blocks: &[Block], difficulty: usize) -> bool {
    if blocks.is_empty() {
        debug!("chain rejected: no blocks");
        return false;
    }
    for (height, pair) in blocks.windows(2).enumerate() {
        let (previous, block) = (&pair[0], &pair[1]);
        if block.previous_hash != previous.hash() {
            debug!(height = height + 1, "chain rejected: broken hash link");
            return false;
        }
        if !block.meets_difficulty(difficulty) {
            debug!(height = height + 1, difficulty, "chain rejected: insufficient proof of work");
            return false;
        }
    }
    true
}

/// Hash-link check only: each block's previous hash equals the hash of the
/// block before it.
pub fn is_valid_chain(blocks: &[Block]) -> bool {
    is_valid_chain_at(blocks, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Identity;
    use crate::miner::proof_of_work;
    use crate::transaction::{Amount, Transaction};

    fn mined_chain(length: usize, difficulty: usize) -> Vec<Block> {
        let miner = Identity::generate().unwrap();
        let mut blocks = vec![Block::genesis()];
        for i in 1..length {
            let template = Block::new(
                i as i64,
                blocks[i - 1].hash(),
                vec![Transaction::reward(
                    miner.address().clone(),
                    Amount::from_coins(1.0).unwrap(),
                )],
            );
            let nonce = proof_of_work(&template, difficulty, || false).unwrap();
            blocks.push(template.with_nonce(nonce));
        }
        blocks
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        assert!(!is_valid_chain(&[]));
    }

    #[test]
    fn test_genesis_only_chain_is_valid() {
        assert!(is_valid_chain(&[Block::genesis()]));
    }

    #[test]
    fn test_linked_chain_is_valid() {
        let blocks = mined_chain(4, 1);
        assert!(is_valid_chain(&blocks));
        assert!(is_valid_chain_at(&blocks, 1));
    }

    #[test]
    fn test_tampered_transaction_breaks_link() {
        let mut blocks = mined_chain(3, 1);
        blocks[1].transactions[0].amount = Amount::from_coins(100.0).unwrap();
        assert!(!is_valid_chain(&blocks));
    }

    #[test]
    fn test_tampered_nonce_breaks_link() {
        let mut blocks = mined_chain(3, 1);
        blocks[1].nonce += 1;
        assert!(!is_valid_chain(&blocks));
    }

    #[test]
    fn test_tampered_tip_fails_proof_check() {
        let mut blocks = mined_chain(3, 2);
        // Editing the tip keeps every link but drops the proof.
        let tip = blocks.len() - 1;
        let mut nonce = blocks[tip].nonce;
        loop {
            nonce += 1;
            let candidate = blocks[tip].clone().with_nonce(nonce);
            if !candidate.meets_difficulty(2) {
                blocks[tip] = candidate;
                break;
            }
        }
        assert!(is_valid_chain(&blocks));
        assert!(!is_valid_chain_at(&blocks, 2));
    }
}

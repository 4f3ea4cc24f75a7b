use crate::address::Address;
use crate::blockchain::core::state::{balance_of, AccountState};
use crate::blockchain::core::validation::is_valid_chain;
use crate::crypto::{self, PublicKey, Signature};
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::miner::{self, AutoMiner, CancelToken};
use crate::transaction::{Amount, Sender, SignedSubmission, Transaction};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub type Sha256Hash = [u8; 32];

/// Leading zero hex digits required of a block hash.
pub const MINING_DIFFICULTY: usize = 3;
/// Reward paid to the ledger owner for every mined block, in micro-units.
pub const MINING_REWARD: Amount = Amount::from_units(Amount::UNITS_PER_COIN);

const BLOCK_DOMAIN_TAG: &[u8] = b"BLOCK:";

/// How long a round waits on another round's search before re-checking
/// cancellation.
const MINING_LOCK_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Creation instant in unix nanoseconds.
    pub timestamp: i64,
    pub nonce: u64,
    #[serde(with = "hash_hex")]
    pub previous_hash: Sha256Hash,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(timestamp: i64, previous_hash: Sha256Hash, transactions: Vec<Transaction>) -> Self {
        Block {
            timestamp,
            nonce: 0,
            previous_hash,
            transactions,
        }
    }

    /// The canonical empty default block whose hash anchors genesis.
    pub fn empty() -> Self {
        Block::new(0, [0u8; 32], Vec::new())
    }

    pub fn genesis() -> Self {
        Block::new(now_nanos(), Block::empty().hash(), Vec::new())
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// SHA-256 over `"BLOCK:"`, timestamp LE, nonce LE, previous hash,
    /// transaction count as u32 LE, then each transaction's canonical bytes.
    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(BLOCK_DOMAIN_TAG);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.previous_hash);
        hasher.update((self.transactions.len() as u32).to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.canonical_bytes());
        }
        hasher.finalize().into()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        leading_zero_hex_digits(&self.hash()) >= difficulty
    }
}

/// Number of leading `'0'` characters in the hex form of `hash`.
pub fn leading_zero_hex_digits(hash: &Sha256Hash) -> usize {
    let mut zeros = 0;
    for byte in hash {
        if *byte == 0 {
            zeros += 2;
            continue;
        }
        if byte >> 4 == 0 {
            zeros += 1;
        }
        break;
    }
    zeros
}

fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

mod hash_hex {
    use super::Sha256Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Sha256Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sha256Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut hash = [0u8; 32];
        hex::decode_to_slice(&s, &mut hash).map_err(serde::de::Error::custom)?;
        Ok(hash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub difficulty: usize,
    pub reward: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty: MINING_DIFFICULTY,
            reward: MINING_REWARD,
        }
    }
}

#[derive(Debug)]
struct LedgerState {
    // Copy-on-write so readers can fold over a snapshot without holding the lock.
    chain: Arc<Vec<Block>>,
    pool: Mempool,
}

/// The append-only chain plus the pending pool of a single node.
///
/// Construct once at startup and share it behind an `Arc`. Admission holds
/// the state lock only briefly; mining searches for a nonce outside the
/// state lock and commits atomically.
#[derive(Debug)]
pub struct Ledger {
    owner: Address,
    config: LedgerConfig,
    state: RwLock<LedgerState>,
    // Serializes mining rounds so at most one search builds on the tip.
    mining: Mutex<()>,
    shutdown: CancelToken,
    auto_miner: Mutex<Option<AutoMiner>>,
}

impl Ledger {
    pub fn new(owner: Address, config: LedgerConfig) -> Self {
        let genesis = Block::genesis();
        info!(
            owner = %owner,
            difficulty = config.difficulty,
            reward = %config.reward,
            genesis = %genesis.hash_hex(),
            "ledger created"
        );
        Ledger {
            owner,
            config,
            state: RwLock::new(LedgerState {
                chain: Arc::new(vec![genesis]),
                pool: Mempool::new(),
            }),
            mining: Mutex::new(()),
            shutdown: CancelToken::new(),
            auto_miner: Mutex::new(None),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    /// Admits a transaction into the pending pool.
    ///
    /// Rewards from the reserved system sender are accepted unconditionally.
    /// Every other transaction needs a valid signature from a key that
    /// derives the sender address, and the sender's confirmed balance minus
    /// what it already has pending must cover the amount.
    pub fn add_transaction(
        &self,
        tx: Transaction,
        sender_public_key: Option<&PublicKey>,
        signature: Option<&Signature>,
    ) -> Result<(), ChainError> {
        let sender = match &tx.sender {
            Sender::System => {
                debug!(recipient = %tx.recipient, amount = %tx.amount, "reward queued");
                self.state.write().pool.add(tx);
                return Ok(());
            }
            Sender::Account(address) => address.clone(),
        };

        let (public_key, signature) = match (sender_public_key, signature) {
            (Some(pk), Some(sig)) => (pk, sig),
            _ => {
                warn!(sender = %sender, "transaction rejected: unsigned");
                return Err(ChainError::InvalidSignature);
            }
        };
        if !crypto::verify(public_key, signature, &tx) {
            warn!(sender = %sender, "transaction rejected: signature verification failed");
            return Err(ChainError::InvalidSignature);
        }
        if public_key.address() != sender {
            warn!(sender = %sender, "transaction rejected: key does not own sender address");
            return Err(ChainError::SenderKeyMismatch);
        }

        loop {
            let snapshot = self.chain();
            let confirmed = balance_of(&snapshot, &sender);

            let mut state = self.state.write();
            if state.chain.len() != snapshot.len() {
                // A block landed while folding; recompute against the new tip.
                continue;
            }
            let available = confirmed.saturating_sub(state.pool.pending_debits(&sender));
            if available < tx.amount {
                warn!(
                    sender = %sender,
                    available = %available,
                    requested = %tx.amount,
                    "transaction rejected: insufficient balance"
                );
                return Err(ChainError::InsufficientBalance {
                    address: sender.to_string(),
                    balance: available,
                    requested: tx.amount,
                });
            }

            info!(
                sender = %sender,
                recipient = %tx.recipient,
                amount = %tx.amount,
                tx = %tx.hash_str(),
                "transaction admitted"
            );
            state.pool.add(tx);
            return Ok(());
        }
    }

    pub fn submit(&self, submission: SignedSubmission) -> Result<(), ChainError> {
        self.add_transaction(
            submission.transaction,
            Some(&submission.sender_public_key),
            Some(&submission.signature),
        )
    }

    /// Nonce search over a trial block built from the current pool and tip.
    /// The trial block carries timestamp 0, so the result depends only on
    /// the pool contents and the previous hash.
    pub fn proof_of_work(&self, difficulty: usize) -> Result<u64, ChainError> {
        let template = {
            let state = self.state.read();
            let last = state.chain.last().ok_or_else(empty_chain)?;
            Block::new(0, last.hash(), state.pool.snapshot())
        };
        miner::proof_of_work(&template, difficulty, || self.shutdown.is_cancelled())
    }

    /// Seals the pending pool plus a reward for the owner into a new block.
    pub fn mine(&self) -> Result<Block, ChainError> {
        self.mine_with(|| false)
    }

    /// Like [`Ledger::mine`], but the search also stops when `is_cancelled`
    /// returns true. The ledger's shutdown signal always cancels. A round
    /// queued behind another search re-checks cancellation while it waits.
    pub fn mine_with<F>(&self, is_cancelled: F) -> Result<Block, ChainError>
    where
        F: Fn() -> bool,
    {
        let cancelled = || self.shutdown.is_cancelled() || is_cancelled();
        let _round = loop {
            if let Some(guard) = self.mining.try_lock_for(MINING_LOCK_POLL) {
                break guard;
            }
            if cancelled() {
                debug!("mining round cancelled while waiting for another search");
                return Err(ChainError::MiningAborted);
            }
        };

        let (template, taken) = {
            let state = self.state.read();
            let last = state.chain.last().ok_or_else(empty_chain)?;
            let mut transactions = state.pool.snapshot();
            let taken = transactions.len();
            transactions.push(Transaction::reward(self.owner.clone(), self.config.reward));

            let timestamp = now_nanos().max(last.timestamp.saturating_add(1));
            (Block::new(timestamp, last.hash(), transactions), taken)
        };

        let nonce = miner::proof_of_work(&template, self.config.difficulty, &cancelled)?;
        let block = template.with_nonce(nonce);

        let height = {
            let mut state = self.state.write();
            Arc::make_mut(&mut state.chain).push(block.clone());
            state.pool.drain_front(taken);
            state.chain.len() - 1
        };

        info!(
            height,
            nonce,
            hash = %block.hash_hex(),
            transactions = block.transactions.len(),
            "action=mining, status=success"
        );
        Ok(block)
    }

    /// Balance of `address` replayed over a snapshot of the chain.
    pub fn balance(&self, address: &Address) -> Amount {
        balance_of(&self.chain(), address)
    }

    pub fn account_state(&self) -> AccountState {
        AccountState::from_chain(&self.chain())
    }

    /// Cheap snapshot of the chain; later blocks do not appear in it.
    pub fn chain(&self) -> Arc<Vec<Block>> {
        self.state.read().chain.clone()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.read().pool.snapshot()
    }

    pub fn last_block(&self) -> Result<Block, ChainError> {
        self.state
            .read()
            .chain
            .last()
            .cloned()
            .ok_or_else(empty_chain)
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> usize {
        self.state.read().chain.len()
    }

    pub fn is_valid(&self) -> bool {
        is_valid_chain(&self.chain())
    }

    /// Starts mining a block every `interval` on a background task.
    pub fn start_auto_mining(self: &Arc<Self>, interval: Duration) -> Result<(), ChainError> {
        if interval.is_zero() {
            return Err(ChainError::ConfigError(
                "auto-mining interval must be greater than zero".to_string(),
            ));
        }
        let mut slot = self.auto_miner.lock();
        if slot.as_ref().is_some_and(AutoMiner::is_running) {
            return Err(ChainError::AutoMiningAlreadyRunning);
        }
        *slot = Some(AutoMiner::spawn(self.clone(), interval));
        Ok(())
    }

    /// Stops the auto-mining task, interrupting any in-flight search.
    pub async fn stop_auto_mining(&self) -> Result<(), ChainError> {
        let running = self.auto_miner.lock().take();
        match running {
            Some(auto_miner) => {
                auto_miner.stop().await;
                Ok(())
            }
            None => Err(ChainError::AutoMiningNotRunning),
        }
    }

    pub fn is_auto_mining(&self) -> bool {
        self.auto_miner
            .lock()
            .as_ref()
            .is_some_and(AutoMiner::is_running)
    }

    /// Cancels every current and future search and stops auto-mining.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let running = self.auto_miner.lock().take();
        if let Some(auto_miner) = running {
            auto_miner.stop().await;
        }
        info!(height = self.height(), "ledger shut down");
    }
}

fn empty_chain() -> ChainError {
    error!("chain invariant violated: ledger has no blocks");
    ChainError::EmptyChainInvariantViolated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Identity;
    use std::cell::Cell;

    fn coins(value: f64) -> Amount {
        Amount::from_coins(value).unwrap()
    }

    fn test_ledger(owner: &Identity) -> Ledger {
        Ledger::new(
            owner.address().clone(),
            LedgerConfig {
                difficulty: 1,
                reward: coins(1.0),
            },
        )
    }

    fn unreachable_ledger(owner: &Identity, difficulty: usize) -> Arc<Ledger> {
        Arc::new(Ledger::new(
            owner.address().clone(),
            LedgerConfig {
                difficulty,
                reward: coins(1.0),
            },
        ))
    }

    fn signed_transfer(
        from: &Identity,
        to: &Address,
        amount: Amount,
    ) -> (Transaction, Signature) {
        let tx = Transaction::new(from.address().clone(), to.clone(), amount).unwrap();
        let signature = from.sign(&tx);
        (tx, signature)
    }

    #[test]
    fn test_genesis_block() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);

        assert_eq!(ledger.height(), 1);
        assert!(ledger.pending_transactions().is_empty());

        let genesis = ledger.last_block().unwrap();
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.previous_hash, Block::empty().hash());
        assert!(genesis.transactions.is_empty());
    }

    #[test]
    fn test_nonce_changes_hash() {
        let block = Block::genesis();
        assert_ne!(block.hash(), block.clone().with_nonce(1).hash());
    }

    #[test]
    fn test_leading_zero_hex_digits() {
        let mut hash = [0xffu8; 32];
        assert_eq!(leading_zero_hex_digits(&hash), 0);
        hash[0] = 0x0f;
        assert_eq!(leading_zero_hex_digits(&hash), 1);
        hash[0] = 0x00;
        hash[1] = 0x01;
        assert_eq!(leading_zero_hex_digits(&hash), 3);
        assert_eq!(leading_zero_hex_digits(&[0u8; 32]), 64);
    }

    #[test]
    fn test_mining_invariants() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);
        let previous = ledger.last_block().unwrap();

        let block = ledger.mine().unwrap();

        assert_eq!(ledger.height(), 2);
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(block.previous_hash, previous.hash());
        assert!(block.timestamp > previous.timestamp);
        assert!(block.meets_difficulty(1));

        let rewards: Vec<_> = block.transactions.iter().filter(|tx| tx.is_reward()).collect();
        assert_eq!(rewards.len(), 1);
        assert_eq!(&rewards[0].recipient, owner.address());
        assert_eq!(rewards[0].amount, coins(1.0));
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_transfer_scenario() {
        let alice = Identity::generate().unwrap();
        let bob = Identity::generate().unwrap();
        let ledger = test_ledger(&alice);

        ledger.mine().unwrap();
        assert_eq!(ledger.balance(alice.address()), coins(1.0));
        assert_eq!(ledger.height(), 2);

        let (tx, signature) = signed_transfer(&alice, bob.address(), coins(0.4));
        ledger
            .add_transaction(tx, Some(alice.public_key()), Some(&signature))
            .unwrap();
        assert_eq!(ledger.pending_transactions().len(), 1);

        ledger.mine().unwrap();
        assert_eq!(ledger.height(), 3);
        assert_eq!(ledger.balance(alice.address()), coins(1.6));
        assert_eq!(ledger.balance(bob.address()), coins(0.4));
    }

    #[test]
    fn test_insufficient_balance_rejected() {
        let alice = Identity::generate().unwrap();
        let bob = Identity::generate().unwrap();
        let ledger = test_ledger(&alice);
        ledger.mine().unwrap();

        let (tx, signature) = signed_transfer(&alice, bob.address(), coins(1.5));
        let result = ledger.add_transaction(tx, Some(alice.public_key()), Some(&signature));
        assert!(matches!(
            result,
            Err(ChainError::InsufficientBalance { balance, requested, .. })
                if balance == coins(1.0) && requested == coins(1.5)
        ));
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn test_pending_transfers_cannot_jointly_overdraw() {
        let alice = Identity::generate().unwrap();
        let bob = Identity::generate().unwrap();
        let ledger = test_ledger(&alice);
        ledger.mine().unwrap();

        let (first, sig) = signed_transfer(&alice, bob.address(), coins(0.7));
        ledger
            .add_transaction(first, Some(alice.public_key()), Some(&sig))
            .unwrap();

        let (second, sig) = signed_transfer(&alice, bob.address(), coins(0.7));
        let result = ledger.add_transaction(second, Some(alice.public_key()), Some(&sig));
        assert!(matches!(result, Err(ChainError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let alice = Identity::generate().unwrap();
        let bob = Identity::generate().unwrap();
        let ledger = test_ledger(&alice);
        ledger.mine().unwrap();

        let (tx, signature) = signed_transfer(&alice, bob.address(), coins(0.4));
        let tampered = Transaction::new(
            alice.address().clone(),
            bob.address().clone(),
            coins(0.9),
        )
        .unwrap();
        assert_eq!(
            ledger.add_transaction(tampered, Some(alice.public_key()), Some(&signature)),
            Err(ChainError::InvalidSignature)
        );
        assert_eq!(
            ledger.add_transaction(tx, None, None),
            Err(ChainError::InvalidSignature)
        );
    }

    #[test]
    fn test_foreign_key_cannot_spend() {
        let alice = Identity::generate().unwrap();
        let mallory = Identity::generate().unwrap();
        let ledger = test_ledger(&alice);
        ledger.mine().unwrap();

        // Mallory signs a debit of Alice's account with her own key.
        let tx = Transaction::new(
            alice.address().clone(),
            mallory.address().clone(),
            coins(0.5),
        )
        .unwrap();
        let signature = mallory.sign(&tx);
        assert_eq!(
            ledger.add_transaction(tx, Some(mallory.public_key()), Some(&signature)),
            Err(ChainError::SenderKeyMismatch)
        );
    }

    #[test]
    fn test_reward_sender_bypasses_verification() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);
        let reward = Transaction::reward(owner.address().clone(), coins(5.0));
        ledger.add_transaction(reward, None, None).unwrap();
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn test_proof_of_work_zero_difficulty() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);
        assert_eq!(ledger.proof_of_work(0).unwrap(), 0);
    }

    #[test]
    fn test_late_admissions_stay_pooled() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);
        ledger
            .add_transaction(Transaction::reward(owner.address().clone(), coins(2.0)), None, None)
            .unwrap();

        // Admit a transaction while the search is running.
        let admitted = Cell::new(false);
        let block = ledger
            .mine_with(|| {
                if !admitted.get() {
                    admitted.set(true);
                    ledger
                        .add_transaction(
                            Transaction::reward(owner.address().clone(), coins(3.0)),
                            None,
                            None,
                        )
                        .unwrap();
                }
                false
            })
            .unwrap();

        assert_eq!(block.transactions.len(), 2);
        let pending = ledger.pending_transactions();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].amount, coins(3.0));
    }

    #[test]
    fn test_cancelled_mining_leaves_state_untouched() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);
        ledger
            .add_transaction(Transaction::reward(owner.address().clone(), coins(2.0)), None, None)
            .unwrap();

        assert_eq!(ledger.mine_with(|| true), Err(ChainError::MiningAborted));
        assert_eq!(ledger.height(), 1);
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn test_chain_snapshot_is_immutable() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);
        let snapshot = ledger.chain();
        ledger.mine().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(ledger.chain().len(), 2);
    }

    #[test]
    fn test_block_json_shape() {
        let owner = Identity::generate().unwrap();
        let ledger = test_ledger(&owner);
        let block = ledger.mine().unwrap();

        let json = serde_json::to_value(&block).unwrap();
        assert!(json["timestamp"].is_i64());
        assert!(json["nonce"].is_u64());
        assert_eq!(json["previous_hash"].as_str().unwrap().len(), 64);
        assert_eq!(json["transactions"][0]["sender"], crate::transaction::MINING_SENDER);

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[tokio::test]
    async fn test_auto_mining_start_and_stop() {
        let owner = Identity::generate().unwrap();
        let ledger = Arc::new(test_ledger(&owner));

        ledger
            .start_auto_mining(Duration::from_millis(20))
            .unwrap();
        assert!(ledger.is_auto_mining());
        assert_eq!(
            ledger.start_auto_mining(Duration::from_millis(20)),
            Err(ChainError::AutoMiningAlreadyRunning)
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        ledger.stop_auto_mining().await.unwrap();
        assert!(!ledger.is_auto_mining());

        let height = ledger.height();
        assert!(height > 1, "expected auto-mined blocks, height {}", height);
        assert!(ledger.is_valid());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ledger.height(), height);
        assert_eq!(
            ledger.stop_auto_mining().await,
            Err(ChainError::AutoMiningNotRunning)
        );
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let owner = Identity::generate().unwrap();
        let ledger = Arc::new(test_ledger(&owner));
        assert!(matches!(
            ledger.start_auto_mining(Duration::ZERO),
            Err(ChainError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_mining() {
        let owner = Identity::generate().unwrap();
        let ledger = Arc::new(test_ledger(&owner));
        ledger.start_auto_mining(Duration::from_secs(60)).unwrap();

        ledger.shutdown().await;
        assert!(!ledger.is_auto_mining());
        assert_eq!(ledger.mine(), Err(ChainError::MiningAborted));
    }

    #[tokio::test]
    async fn test_stop_interrupts_running_search() {
        let owner = Identity::generate().unwrap();
        // Difficulty 10 takes far longer than the test to satisfy.
        let ledger = unreachable_ledger(&owner, 10);
        ledger.start_auto_mining(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let stopped = tokio::time::timeout(Duration::from_secs(1), ledger.stop_auto_mining()).await;
        assert!(matches!(stopped, Ok(Ok(()))), "stop did not return promptly");
        assert!(!ledger.is_auto_mining());
        assert_eq!(ledger.height(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_running_search() {
        let owner = Identity::generate().unwrap();
        let ledger = unreachable_ledger(&owner, 10);
        ledger.start_auto_mining(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let finished = tokio::time::timeout(Duration::from_secs(1), ledger.shutdown()).await;
        assert!(finished.is_ok(), "shutdown did not return promptly");
        assert!(!ledger.is_auto_mining());
        assert_eq!(ledger.height(), 1);
    }

    #[tokio::test]
    async fn test_stop_does_not_wait_for_manual_search() {
        let owner = Identity::generate().unwrap();
        let ledger = unreachable_ledger(&owner, 64);
        let manual = {
            let ledger = ledger.clone();
            tokio::task::spawn_blocking(move || ledger.mine())
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The auto round queues behind the manual search.
        ledger.start_auto_mining(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let stopped = tokio::time::timeout(Duration::from_secs(1), ledger.stop_auto_mining()).await;
        assert!(matches!(stopped, Ok(Ok(()))), "stop waited on the manual search");

        ledger.shutdown().await;
        assert_eq!(manual.await.unwrap(), Err(ChainError::MiningAborted));
        assert_eq!(ledger.height(), 1);
    }
}

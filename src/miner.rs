//! Proof-of-work search and the background auto-mining task.

use crate::blockchain::{Block, Ledger};
use crate::error::ChainError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Number of nonces tried between cancellation checks.
pub const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Shared cancellation flag for in-flight searches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Searches for the first nonce, counting up from 0, whose block hash has at
/// least `difficulty` leading `'0'` hex digits.
///
/// `template` supplies the timestamp, previous hash and transactions; its
/// own nonce is ignored. `is_cancelled` is polled every
/// [`CANCEL_POLL_INTERVAL`] nonces, starting at nonce 0.
pub fn proof_of_work<F>(template: &Block, difficulty: usize, is_cancelled: F) -> Result<u64, ChainError>
where
    F: Fn() -> bool,
{
    let mut candidate = template.clone();
    let mut nonce: u64 = 0;
    loop {
        if nonce % CANCEL_POLL_INTERVAL == 0 && is_cancelled() {
            debug!(nonce, "proof-of-work search cancelled");
            return Err(ChainError::MiningAborted);
        }
        candidate.nonce = nonce;
        if candidate.meets_difficulty(difficulty) {
            return Ok(nonce);
        }
        nonce = nonce.checked_add(1).ok_or(ChainError::MiningAborted)?;
    }
}

/// A running auto-mining loop. Owned by the [`Ledger`] it mines for.
#[derive(Debug)]
pub struct AutoMiner {
    cancel: CancelToken,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl AutoMiner {
    /// Spawns a task that mines one block every `interval` until stopped.
    /// Must be called from within a tokio runtime.
    pub fn spawn(ledger: Arc<Ledger>, interval: Duration) -> Self {
        let cancel = CancelToken::new();
        let wake = Arc::new(Notify::new());
        let token = cancel.clone();
        let stopped = wake.clone();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs_f64(), "auto-mining started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; wait a full period first.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.notified() => break,
                }
                if token.is_cancelled() {
                    break;
                }

                let ledger = ledger.clone();
                let round_token = token.clone();
                let result = tokio::task::spawn_blocking(move || {
                    ledger.mine_with(move || round_token.is_cancelled())
                })
                .await;

                match result {
                    Ok(Ok(block)) => debug!(
                        nonce = block.nonce,
                        transactions = block.transactions.len(),
                        "auto-mined block"
                    ),
                    Ok(Err(ChainError::MiningAborted)) => break,
                    Ok(Err(e)) => warn!(error = %e, "auto-mining round failed"),
                    Err(e) => {
                        warn!(error = %e, "auto-mining worker panicked");
                        break;
                    }
                }
            }
            info!("auto-mining stopped");
        });

        AutoMiner {
            cancel,
            wake,
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancels any in-flight search and waits for the loop to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.wake.notify_one();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "auto-mining task ended abnormally");
        }
    }
}

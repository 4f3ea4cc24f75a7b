//! Error types for LedgerChain

use crate::transaction::Amount;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Sender public key does not derive the sender address")]
    SenderKeyMismatch,
    #[error("Insufficient balance: {address} holds {balance} but requested {requested}")]
    InsufficientBalance {
        address: String,
        balance: Amount,
        requested: Amount,
    },
    #[error("Malformed address: {0}")]
    MalformedAddress(String),
    #[error("Malformed public key: {0}")]
    MalformedPublicKey(String),
    #[error("Malformed private key: {0}")]
    MalformedPrivateKey(String),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Mining aborted")]
    MiningAborted,
    #[error("Auto-mining is already running")]
    AutoMiningAlreadyRunning,
    #[error("Auto-mining is not running")]
    AutoMiningNotRunning,
    #[error("Chain invariant violated: the chain is empty")]
    EmptyChainInvariantViolated,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

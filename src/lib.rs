//! LedgerChain - a single-node proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, balances and chain validity
//! - [`transaction`] - Amounts, transactions and boundary validation
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work search and auto-mining
//!
//! ## Cryptography
//! - [`crypto`] - Identities, signatures and verification (secp256k1)
//! - [`address`] - Base58Check addresses
//!
//! ## Networking & Integration
//! - [`discovery`] - Neighbor discovery
//! - [`api`] - HTTP API (feature `api`)
//! - [`node`] - Node orchestration
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod address;
pub mod crypto;

// ============================================================================
// Networking & Integration
// ============================================================================
pub mod discovery;
pub mod node;

#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// chain management, balance derivation and chain validity.

pub mod core;
pub use self::core::*;

//! Base58Check addresses derived from public keys.
//!
//! Derivation pipeline:
//! `SHA-256(X || Y)` -> `RIPEMD-160` -> prepend version `0x00`
//! -> append the first 4 bytes of `SHA-256(SHA-256(versioned))` -> Base58.

use crate::crypto::PublicKey;
use crate::error::ChainError;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Version byte prepended to the RIPEMD-160 payload.
pub const ADDRESS_VERSION: u8 = 0x00;
/// Length of the RIPEMD-160 payload.
pub const PAYLOAD_SIZE: usize = 20;
/// Length of the double-SHA-256 checksum suffix.
pub const CHECKSUM_SIZE: usize = 4;
/// Total decoded length: version + payload + checksum.
pub const DECODED_ADDRESS_SIZE: usize = 1 + PAYLOAD_SIZE + CHECKSUM_SIZE;

/// A checksummed, human-shareable account identifier.
///
/// An `Address` can only be obtained by deriving it from a public key or by
/// parsing a string whose checksum verifies, so holders never need to
/// re-validate it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Derives the address of a public key. Pure and deterministic.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let key_digest = Sha256::digest(public_key.coordinates());
        let payload = Ripemd160::digest(key_digest);

        let mut versioned = Vec::with_capacity(DECODED_ADDRESS_SIZE);
        versioned.push(ADDRESS_VERSION);
        versioned.extend_from_slice(&payload);

        let checksum = checksum(&versioned);
        versioned.extend_from_slice(&checksum);

        Address(bs58::encode(versioned).into_string())
    }

    /// Parses and verifies a Base58Check address received at the boundary.
    pub fn parse(s: &str) -> Result<Self, ChainError> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|e| ChainError::MalformedAddress(format!("invalid base58: {}", e)))?;

        if decoded.len() != DECODED_ADDRESS_SIZE {
            return Err(ChainError::MalformedAddress(format!(
                "address must decode to {} bytes, got {}",
                DECODED_ADDRESS_SIZE,
                decoded.len()
            )));
        }
        if decoded[0] != ADDRESS_VERSION {
            return Err(ChainError::MalformedAddress(format!(
                "unsupported version byte 0x{:02x}",
                decoded[0]
            )));
        }

        let (versioned, found) = decoded.split_at(1 + PAYLOAD_SIZE);
        if checksum(versioned) != found {
            return Err(ChainError::MalformedAddress(
                "checksum mismatch".to_string(),
            ));
        }

        Ok(Address(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 20-byte RIPEMD-160 payload.
    pub fn payload(&self) -> [u8; PAYLOAD_SIZE] {
        let mut payload = [0u8; PAYLOAD_SIZE];
        // The string was validated on construction.
        if let Ok(decoded) = bs58::decode(&self.0).into_vec() {
            payload.copy_from_slice(&decoded[1..1 + PAYLOAD_SIZE]);
        }
        payload
    }
}

fn checksum(versioned: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let digest = Sha256::digest(Sha256::digest(versioned));
    let mut out = [0u8; CHECKSUM_SIZE];
    out.copy_from_slice(&digest[..CHECKSUM_SIZE]);
    out
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl std::str::FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

//! Cryptographic primitives for LedgerChain
//!
//! Identities are ECDSA key pairs on secp256k1. Keys, signatures and
//! coordinates travel as fixed-width hex so that every field has exactly one
//! textual form.

use crate::address::Address;
use crate::error::ChainError;
use crate::transaction::Transaction;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, SECRET_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE},
    ecdsa, All, Message, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Byte width of a single curve coordinate or scalar.
pub const COORDINATE_SIZE: usize = 32;
/// Hex length of a serialized public key (X || Y).
pub const PUBLIC_KEY_HEX_LEN: usize = COORDINATE_SIZE * 2 * 2;
/// Hex length of a serialized signature (r || s).
pub const SIGNATURE_HEX_LEN: usize = COMPACT_SIGNATURE_SIZE * 2;
/// Hex length of a serialized private key.
pub const PRIVATE_KEY_HEX_LEN: usize = SECRET_KEY_SIZE * 2;

/// How many times key generation redraws after hitting an invalid scalar.
const KEYGEN_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(secp256k1::PublicKey);

impl PublicKey {
    /// The affine coordinates X || Y, each zero-padded to 32 bytes.
    pub fn coordinates(&self) -> [u8; COORDINATE_SIZE * 2] {
        let uncompressed: [u8; UNCOMPRESSED_PUBLIC_KEY_SIZE] = self.0.serialize_uncompressed();
        let mut out = [0u8; COORDINATE_SIZE * 2];
        // Skip the 0x04 SEC1 tag.
        out.copy_from_slice(&uncompressed[1..]);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.coordinates())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ChainError> {
        if hex_str.len() != PUBLIC_KEY_HEX_LEN {
            return Err(ChainError::MalformedPublicKey(format!(
                "Public key must be exactly {} hex characters, got {}",
                PUBLIC_KEY_HEX_LEN,
                hex_str.len()
            )));
        }
        let coordinates = hex::decode(hex_str)
            .map_err(|e| ChainError::MalformedPublicKey(format!("Invalid hex: {}", e)))?;

        let mut sec1 = Vec::with_capacity(UNCOMPRESSED_PUBLIC_KEY_SIZE);
        sec1.push(0x04);
        sec1.extend_from_slice(&coordinates);

        secp256k1::PublicKey::from_slice(&sec1)
            .map(PublicKey)
            .map_err(|e| ChainError::MalformedPublicKey(format!("Point not on curve: {}", e)))
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// ECDSA signature (r, s) over the SHA-256 digest of a transaction's
/// canonical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(ecdsa::Signature);

impl Signature {
    /// r || s, each a 32-byte big-endian integer, hex encoded.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.serialize_compact())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ChainError> {
        if hex_str.len() != SIGNATURE_HEX_LEN {
            return Err(ChainError::MalformedSignature(format!(
                "Signature must be exactly {} hex characters, got {}",
                SIGNATURE_HEX_LEN,
                hex_str.len()
            )));
        }
        let bytes = hex::decode(hex_str)
            .map_err(|e| ChainError::MalformedSignature(format!("Invalid hex: {}", e)))?;
        ecdsa::Signature::from_compact(&bytes)
            .map(Signature)
            .map_err(|e| ChainError::MalformedSignature(format!("Invalid (r, s): {}", e)))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A key pair plus the address derived from it. Never shared between actors.
#[derive(Debug, Clone)]
pub struct Identity {
    secret_key: SecretKey,
    public_key: PublicKey,
    address: Address,
}

impl Identity {
    /// Generates a new identity from the OS random number generator.
    ///
    /// A failing entropy source is reported as `KeyGenerationFailed` instead
    /// of panicking.
    pub fn generate() -> Result<Self, ChainError> {
        let mut bytes = [0u8; SECRET_KEY_SIZE];
        for _ in 0..KEYGEN_ATTEMPTS {
            OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| ChainError::KeyGenerationFailed(e.to_string()))?;
            // Zero or >= curve order: draw again.
            if let Ok(secret_key) = SecretKey::from_slice(&bytes) {
                return Ok(Self::from_secret_key(secret_key));
            }
        }
        Err(ChainError::KeyGenerationFailed(
            "entropy source kept producing invalid scalars".to_string(),
        ))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey(secp256k1::PublicKey::from_secret_key(
            &SECP256K1_CONTEXT,
            &secret_key,
        ));
        let address = public_key.address();
        Identity {
            secret_key,
            public_key,
            address,
        }
    }

    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, ChainError> {
        if hex_str.len() != PRIVATE_KEY_HEX_LEN {
            return Err(ChainError::MalformedPrivateKey(format!(
                "Private key must be exactly {} hex characters, got {}",
                PRIVATE_KEY_HEX_LEN,
                hex_str.len()
            )));
        }
        let bytes = hex::decode(hex_str)
            .map_err(|e| ChainError::MalformedPrivateKey(format!("Invalid hex: {}", e)))?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| ChainError::MalformedPrivateKey(format!("Invalid scalar: {}", e)))?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex()
    }

    /// Signs the SHA-256 digest of the transaction's canonical bytes.
    pub fn sign(&self, transaction: &Transaction) -> Signature {
        let message = Message::from_digest(signing_digest(transaction));
        Signature(SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key))
    }
}

fn signing_digest(transaction: &Transaction) -> [u8; 32] {
    Sha256::digest(transaction.canonical_bytes()).into()
}

/// Verifies `signature` over `transaction` against `public_key`.
///
/// High-S signatures produced by other ECDSA implementations are normalized
/// before verification; secp256k1 only accepts the low-S form.
pub fn verify(public_key: &PublicKey, signature: &Signature, transaction: &Transaction) -> bool {
    let message = Message::from_digest(signing_digest(transaction));
    let mut normalized = signature.0;
    normalized.normalize_s();
    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &normalized, &public_key.0)
        .is_ok()
}

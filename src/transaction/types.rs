/// Transaction types for LedgerChain
use crate::address::Address;
use crate::crypto::{PublicKey, Signature};
use crate::error::ChainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Reserved sender tag for mining rewards. Not a valid Base58Check address.
pub const MINING_SENDER: &str = "THE BLOCKCHAIN";

/// Domain separation tag prefixed to every canonical transaction encoding.
const TX_DOMAIN_TAG: &[u8] = b"TX:";

/// A quantity of coins held as integer micro-units.
///
/// Arithmetic and hashing never touch floating point; only the wire form
/// expresses amounts in decimal coins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const UNITS_PER_COIN: i64 = 1_000_000;
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: i64) -> Self {
        Amount(units)
    }

    /// Converts a decimal coin value, rounding to the nearest micro-unit.
    pub fn from_coins(coins: f64) -> Result<Self, ChainError> {
        if !coins.is_finite() {
            return Err(ChainError::InvalidTransaction(
                "Amount must be a finite number".to_string(),
            ));
        }
        let units = (coins * Self::UNITS_PER_COIN as f64).round();
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
        if units >= i64::MAX as f64 || units < i64::MIN as f64 {
            return Err(ChainError::InvalidTransaction(format!(
                "Amount {} is out of range",
                coins
            )));
        }
        Ok(Amount(units as i64))
    }

    pub const fn units(&self) -> i64 {
        self.0
    }

    pub fn to_coins(&self) -> f64 {
        self.0 as f64 / Self::UNITS_PER_COIN as f64
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_coin = Self::UNITS_PER_COIN as u64;
        write!(f, "{}{}.{:06}", sign, abs / per_coin, abs % per_coin)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_coins())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coins = f64::deserialize(deserializer)?;
        Amount::from_coins(coins).map_err(serde::de::Error::custom)
    }
}

/// Who a transaction debits: the reserved system sender or an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sender {
    System,
    Account(Address),
}

impl Sender {
    pub fn as_str(&self) -> &str {
        match self {
            Sender::System => MINING_SENDER,
            Sender::Account(address) => address.as_str(),
        }
    }

    pub fn is(&self, address: &Address) -> bool {
        matches!(self, Sender::Account(a) if a == address)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Sender {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == MINING_SENDER {
            Ok(Sender::System)
        } else {
            Address::parse(&value).map(Sender::Account)
        }
    }
}

impl From<Sender> for String {
    fn from(sender: Sender) -> Self {
        sender.as_str().to_string()
    }
}

impl From<Address> for Sender {
    fn from(address: Address) -> Self {
        Sender::Account(address)
    }
}

/// An account-to-account transfer. Immutable once constructed; the signature
/// lives outside the hashed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Sender,
    pub recipient: Address,
    pub amount: Amount,
}

impl Transaction {
    pub fn new(
        sender: impl Into<Sender>,
        recipient: Address,
        amount: Amount,
    ) -> Result<Self, ChainError> {
        if amount.is_negative() {
            return Err(ChainError::InvalidTransaction(
                "Transfer amount cannot be negative".to_string(),
            ));
        }
        Ok(Transaction {
            sender: sender.into(),
            recipient,
            amount,
        })
    }

    /// Mining reward paid by the reserved system sender.
    pub fn reward(recipient: Address, amount: Amount) -> Self {
        Transaction {
            sender: Sender::System,
            recipient,
            amount,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.sender == Sender::System
    }

    /// Canonical encoding: `"TX:"`, then sender and recipient each as a
    /// u32 LE length plus UTF-8 bytes, then the amount as i64 LE micro-units.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let sender = self.sender.as_str().as_bytes();
        let recipient = self.recipient.as_str().as_bytes();

        let mut message = Vec::with_capacity(TX_DOMAIN_TAG.len() + 16 + sender.len() + recipient.len());
        message.extend_from_slice(TX_DOMAIN_TAG);
        message.extend_from_slice(&(sender.len() as u32).to_le_bytes());
        message.extend_from_slice(sender);
        message.extend_from_slice(&(recipient.len() as u32).to_le_bytes());
        message.extend_from_slice(recipient);
        message.extend_from_slice(&self.amount.units().to_le_bytes());
        message
    }

    pub fn hash(&self) -> [u8; 32] {
        Sha256::digest(self.canonical_bytes()).into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }
}

/// The wire bundle presented to the ledger: a transaction plus the key and
/// signature that authorize it.
#[derive(Debug, Clone)]
pub struct SignedSubmission {
    pub transaction: Transaction,
    pub sender_public_key: PublicKey,
    pub signature: Signature,
}

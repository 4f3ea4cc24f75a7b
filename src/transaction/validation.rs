/// Boundary validation: turns an untrusted wire request into a typed
/// `SignedSubmission` before anything reaches the ledger.
use crate::address::Address;
use crate::crypto::{PublicKey, Signature, PUBLIC_KEY_HEX_LEN, SIGNATURE_HEX_LEN};
use crate::error::ChainError;
use crate::transaction::types::{Amount, SignedSubmission, Transaction};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Accepted textual length of a Base58Check address.
pub const ADDRESS_LEN_RANGE: RangeInclusive<usize> = 26..=35;

/// Body of a SubmitTransaction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    #[serde(default)]
    pub sender_blockchain_address: String,
    #[serde(default)]
    pub recipient_blockchain_address: String,
    #[serde(default)]
    pub sender_public_key: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub signature: String,
}

impl TransactionRequest {
    /// Builds the request a wallet would send for an already signed transfer.
    pub fn from_signed(
        transaction: &Transaction,
        public_key: &PublicKey,
        signature: &Signature,
    ) -> Self {
        TransactionRequest {
            sender_blockchain_address: transaction.sender.to_string(),
            recipient_blockchain_address: transaction.recipient.to_string(),
            sender_public_key: public_key.to_hex(),
            value: transaction.amount.to_coins(),
            signature: signature.to_hex(),
        }
    }

    /// Schema checks: required fields and length bounds.
    pub fn validate(&self) -> Result<(), ChainError> {
        check_address_field("sender_blockchain_address", &self.sender_blockchain_address)?;
        check_address_field(
            "recipient_blockchain_address",
            &self.recipient_blockchain_address,
        )?;

        if self.sender_public_key.len() != PUBLIC_KEY_HEX_LEN {
            return Err(ChainError::MalformedPublicKey(format!(
                "sender_public_key must be {} characters, got {}",
                PUBLIC_KEY_HEX_LEN,
                self.sender_public_key.len()
            )));
        }
        if self.signature.len() != SIGNATURE_HEX_LEN {
            return Err(ChainError::MalformedSignature(format!(
                "signature must be {} characters, got {}",
                SIGNATURE_HEX_LEN,
                self.signature.len()
            )));
        }
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(ChainError::InvalidTransaction(
                "value must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_address_field(field: &str, value: &str) -> Result<(), ChainError> {
    if value.is_empty() {
        return Err(ChainError::MalformedAddress(format!("{} is required", field)));
    }
    if !ADDRESS_LEN_RANGE.contains(&value.len()) {
        return Err(ChainError::MalformedAddress(format!(
            "{} must be {}-{} characters, got {}",
            field,
            ADDRESS_LEN_RANGE.start(),
            ADDRESS_LEN_RANGE.end(),
            value.len()
        )));
    }
    Ok(())
}

impl TryFrom<TransactionRequest> for SignedSubmission {
    type Error = ChainError;

    fn try_from(request: TransactionRequest) -> Result<Self, Self::Error> {
        request.validate()?;

        let sender = Address::parse(&request.sender_blockchain_address)?;
        let recipient = Address::parse(&request.recipient_blockchain_address)?;
        let sender_public_key = PublicKey::from_hex(&request.sender_public_key)?;
        let signature = Signature::from_hex(&request.signature)?;
        let amount = Amount::from_coins(request.value)?;
        if amount == Amount::ZERO {
            return Err(ChainError::InvalidTransaction(
                "value is below the smallest unit".to_string(),
            ));
        }

        Ok(SignedSubmission {
            transaction: Transaction::new(sender, recipient, amount)?,
            sender_public_key,
            signature,
        })
    }
}

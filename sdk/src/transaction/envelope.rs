//! Signed transaction envelopes and their wire encoding.
//!
//! An envelope is a transaction plus the signatures collected so far. The
//! binary form (`bincode`) is what the ledger submitter receives; the hex
//! form is what travels inside JSON, e.g. in whitelist payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::builder::Transaction;
use crate::crypto::Signature;

/// Errors from encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("envelope encoding failed: {0}")]
    Encode(String),

    #[error("envelope decoding failed: {0}")]
    Decode(String),

    #[error("envelope is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// A signature tagged with the last four bytes of the signer's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: Signature,
}

/// A transaction and its signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub tx: Transaction,
    pub signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    /// Wraps an unsigned transaction.
    pub fn new(tx: Transaction) -> Self {
        Self {
            tx,
            signatures: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    pub fn to_hex(&self) -> Result<String, CodecError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        Self::from_bytes(&hex::decode(s.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::transaction::{Operation, TransactionBuilder};

    fn envelope() -> TransactionEnvelope {
        let tx = TransactionBuilder::new(Keypair::random().address())
            .fee(200)
            .sequence(9)
            .memo("1-anon-rent")
            .operation(Operation::payment(Keypair::random().address(), 77))
            .build()
            .unwrap();
        TransactionEnvelope::new(tx)
    }

    #[test]
    fn hex_encoding_survives_transport() {
        let env = envelope();
        let decoded = TransactionEnvelope::from_hex(&env.to_hex().unwrap()).unwrap();
        assert_eq!(decoded, env);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            TransactionEnvelope::from_bytes(&[0xFF; 7]),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            TransactionEnvelope::from_hex("zz"),
            Err(CodecError::Hex(_))
        ));
    }
}

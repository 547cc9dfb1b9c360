//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] collects the source, fee, sequence number,
//! memo, and operations, validates them, and hands back an unsigned
//! [`Transaction`]. Signing happens in [`super::signing`]; keeping the two
//! apart means construction is testable without key material.

use serde::{Deserialize, Serialize};

use super::types::Operation;
use crate::config::MAX_MEMO_LENGTH;
use crate::crypto::hash::sha256_concat;
use crate::crypto::Address;
use crate::error::SdkError;

/// Domain tag mixed into every signature payload.
const TX_SIGNATURE_TAG: &[u8] = b"tx";

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An unsigned ledger transaction.
///
/// # Canonical Byte Format
///
/// [`Transaction::signable_bytes`] deterministically serializes: source,
/// fee, sequence, memo, and each operation (source, type tag, destination,
/// amount). Hashes and signatures are computed over that, never over a
/// serde encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Account whose sequence number this transaction consumes and which
    /// pays the fee. A channel, when one is leased.
    pub source: Address,

    /// Total fee offered, in the smallest unit.
    pub fee: u64,

    /// Source account's current sequence number plus one.
    pub sequence: u64,

    /// Text memo, already carrying the app prefix.
    pub memo: Option<String>,

    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Canonical byte representation used for hashing and signing.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128 + self.operations.len() * 96);

        buf.extend_from_slice(self.source.public_key().as_bytes());
        buf.extend_from_slice(&self.fee.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());

        // Memo (length-prefixed if present).
        match &self.memo {
            Some(memo) => {
                buf.push(0x01);
                buf.extend_from_slice(&(memo.len() as u32).to_le_bytes());
                buf.extend_from_slice(memo.as_bytes());
            }
            None => buf.push(0x00),
        }

        buf.extend_from_slice(&(self.operations.len() as u32).to_le_bytes());
        for op in &self.operations {
            match &op.source {
                Some(source) => {
                    buf.push(0x01);
                    buf.extend_from_slice(source.public_key().as_bytes());
                }
                None => buf.push(0x00),
            }
            buf.push(op.body.tag());
            buf.extend_from_slice(op.body.destination().public_key().as_bytes());
            buf.extend_from_slice(&op.body.amount().to_le_bytes());
        }

        buf
    }

    /// `SHA-256(network_id || "tx" || signable_bytes)`.
    ///
    /// This is both the transaction hash the ledger reports and the payload
    /// every signer signs, so a signature is only ever valid on one network.
    pub fn hash(&self, network_id: &[u8; 32]) -> [u8; 32] {
        let body = self.signable_bytes();
        sha256_concat(&[network_id.as_slice(), TX_SIGNATURE_TAG, body.as_slice()])
    }

    /// Hex form of [`Transaction::hash`].
    pub fn hash_hex(&self, network_id: &[u8; 32]) -> String {
        hex::encode(self.hash(network_id))
    }

    /// Distinct accounts whose signatures the ledger requires: the
    /// transaction source first, then every other operation source.
    pub fn required_signers(&self) -> Vec<Address> {
        let mut signers = vec![self.source];
        for op in &self.operations {
            let source = *op.effective_source(&self.source);
            if !signers.contains(&source) {
                signers.push(source);
            }
        }
        signers
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```
/// use ledger_channels::crypto::Keypair;
/// use ledger_channels::transaction::{Operation, TransactionBuilder};
///
/// let source = Keypair::random().address();
/// let dest = Keypair::random().address();
/// let tx = TransactionBuilder::new(source)
///     .fee(100)
///     .sequence(7)
///     .memo("1-anon-hello")
///     .operation(Operation::payment(dest, 50))
///     .build()
///     .unwrap();
/// assert_eq!(tx.sequence, 7);
/// ```
pub struct TransactionBuilder {
    source: Address,
    fee: u64,
    sequence: u64,
    memo: Option<String>,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    pub fn new(source: Address) -> Self {
        Self {
            source,
            fee: 0,
            sequence: 0,
            memo: None,
            operations: Vec::new(),
        }
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn memo(mut self, memo: &str) -> Self {
        self.memo = Some(memo.to_string());
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations.extend(operations);
        self
    }

    /// Validates and produces the unsigned transaction.
    pub fn build(self) -> Result<Transaction, SdkError> {
        if self.operations.is_empty() {
            return Err(SdkError::NoOperations);
        }
        if let Some(memo) = &self.memo {
            if memo.len() > MAX_MEMO_LENGTH {
                return Err(SdkError::MemoTooLong {
                    len: memo.len(),
                    max: MAX_MEMO_LENGTH,
                });
            }
        }
        if self.operations.iter().any(|op| op.body.amount() == 0) {
            return Err(SdkError::ZeroAmount);
        }

        Ok(Transaction {
            source: self.source,
            fee: self.fee,
            sequence: self.sequence,
            memo: self.memo,
            operations: self.operations,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::crypto::Keypair;

    fn sample(source: Address, dest: Address) -> Transaction {
        TransactionBuilder::new(source)
            .fee(100)
            .sequence(1)
            .operation(Operation::payment(dest, 1_000))
            .build()
            .unwrap()
    }

    #[test]
    fn hash_is_deterministic() {
        let source = Keypair::random().address();
        let dest = Keypair::random().address();
        let network = Environment::testnet().network_id();
        assert_eq!(
            sample(source, dest).hash(&network),
            sample(source, dest).hash(&network)
        );
    }

    #[test]
    fn hash_is_bound_to_network() {
        let tx = sample(Keypair::random().address(), Keypair::random().address());
        assert_ne!(
            tx.hash(&Environment::testnet().network_id()),
            tx.hash(&Environment::production().network_id())
        );
    }

    #[test]
    fn sequence_and_memo_change_the_hash() {
        let source = Keypair::random().address();
        let dest = Keypair::random().address();
        let network = Environment::testnet().network_id();
        let base = sample(source, dest);

        let mut bumped = base.clone();
        bumped.sequence += 1;
        assert_ne!(base.hash(&network), bumped.hash(&network));

        let mut memo = base.clone();
        memo.memo = Some("1-anon-x".to_string());
        assert_ne!(base.hash(&network), memo.hash(&network));
    }

    #[test]
    fn operation_source_changes_the_hash() {
        let source = Keypair::random().address();
        let dest = Keypair::random().address();
        let network = Environment::testnet().network_id();
        let base = sample(source, dest);

        let mut sourced = base.clone();
        sourced.operations[0].source = Some(Keypair::random().address());
        assert_ne!(base.hash(&network), sourced.hash(&network));
    }

    #[test]
    fn empty_transaction_is_rejected() {
        let result = TransactionBuilder::new(Keypair::random().address()).build();
        assert!(matches!(result, Err(SdkError::NoOperations)));
    }

    #[test]
    fn oversized_memo_is_rejected() {
        let result = TransactionBuilder::new(Keypair::random().address())
            .memo(&"x".repeat(MAX_MEMO_LENGTH + 1))
            .operation(Operation::payment(Keypair::random().address(), 1))
            .build();
        assert!(matches!(result, Err(SdkError::MemoTooLong { .. })));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let result = TransactionBuilder::new(Keypair::random().address())
            .operation(Operation::payment(Keypair::random().address(), 0))
            .build();
        assert!(matches!(result, Err(SdkError::ZeroAmount)));
    }

    #[test]
    fn required_signers_are_deduplicated() {
        let channel = Keypair::random().address();
        let app = Keypair::random().address();
        let tx = TransactionBuilder::new(channel)
            .operation(Operation::payment(Keypair::random().address(), 1).with_source(app))
            .operation(Operation::payment(Keypair::random().address(), 2).with_source(app))
            .build()
            .unwrap();
        assert_eq!(tx.required_signers(), vec![channel, app]);

        let plain = sample(app, channel);
        assert_eq!(plain.required_signers(), vec![app]);
    }
}

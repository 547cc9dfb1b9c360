//! # Transaction Module
//!
//! Construction, network-bound signing, envelope encoding, and whitelist
//! co-signing.
//!
//! ## Architecture
//!
//! ```text
//! types.rs      Operation and OperationBody
//! builder.rs    Transaction + fluent TransactionBuilder, canonical bytes, hash
//! signing.rs    Appending and checking signatures on an envelope
//! envelope.rs   TransactionEnvelope and its bincode/hex codec
//! whitelist.rs  Co-signing a payload built by someone else
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] against a fresh sequence number.
//! 2. **Sign**: [`sign_envelope`] once per required signer.
//! 3. **Submit**: hand [`TransactionEnvelope::to_bytes`] to the ledger.
//!
//! Nothing here is reused after submission; a retry is a new build.

pub mod builder;
pub mod envelope;
pub mod signing;
pub mod types;
pub mod whitelist;

pub use builder::{Transaction, TransactionBuilder};
pub use envelope::{CodecError, DecoratedSignature, TransactionEnvelope};
pub use signing::{has_signature_from, missing_signers, sign_envelope};
pub use types::{Operation, OperationBody};
pub use whitelist::{cosign, WhitelistPayload};

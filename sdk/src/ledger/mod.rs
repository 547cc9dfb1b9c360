//! # Ledger Collaborators
//!
//! The client never speaks to a ledger directly. It depends on two narrow
//! traits, and whoever embeds it supplies implementations backed by a real
//! transport. Both report failure as a [`RawFault`] (HTTP status plus JSON
//! body, or no status at all), which the client classifies on receipt.
//!
//! [`memory::InMemoryLedger`] implements both traits with ledger-shaped
//! rules and faults; tests and the CLI demo run against it.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::Address;
use crate::error::RawFault;

pub use memory::InMemoryLedger;

/// What the ledger knows about one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: Address,
    /// Last sequence number consumed. The next transaction uses `+ 1`.
    pub sequence: u64,
    pub balance: u64,
}

/// The ledger's answer to an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Hex transaction hash.
    pub hash: String,
    /// Ledger sequence that included the transaction.
    pub ledger: u64,
}

/// Account lookups.
#[async_trait]
pub trait AccountOracle: Send + Sync {
    /// Current sequence and balance of `address`.
    async fn load_account(&self, address: &Address) -> Result<AccountInfo, RawFault>;

    async fn account_exists(&self, address: &Address) -> Result<bool, RawFault>;

    /// Minimum fee per operation.
    async fn minimum_fee(&self) -> Result<u64, RawFault>;
}

/// Envelope submission.
#[async_trait]
pub trait LedgerSubmitter: Send + Sync {
    /// Submits an encoded, signed envelope.
    async fn submit(&self, envelope: &[u8]) -> Result<SubmitResponse, RawFault>;

    /// Looks up an already-applied transaction by hex hash.
    async fn transaction_status(&self, hash: &str) -> Result<Option<SubmitResponse>, RawFault>;
}

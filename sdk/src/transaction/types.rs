//! Operation types.
//!
//! A transaction carries one or more operations. Each operation may name
//! its own source account; when it does not, the transaction's source is
//! used. Channel submissions rely on that split: the channel sources the
//! transaction, the application account sources every operation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Address;

/// What an operation does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    /// Create and fund a new account.
    CreateAccount {
        destination: Address,
        starting_balance: u64,
    },
    /// Move native units to an existing account.
    Payment { destination: Address, amount: u64 },
}

impl OperationBody {
    pub fn destination(&self) -> &Address {
        match self {
            Self::CreateAccount { destination, .. } | Self::Payment { destination, .. } => {
                destination
            }
        }
    }

    /// Units leaving the operation's source account.
    pub fn amount(&self) -> u64 {
        match self {
            Self::CreateAccount {
                starting_balance, ..
            } => *starting_balance,
            Self::Payment { amount, .. } => *amount,
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            Self::CreateAccount { .. } => 0,
            Self::Payment { .. } => 1,
        }
    }
}

impl fmt::Display for OperationBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateAccount { .. } => write!(f, "CreateAccount"),
            Self::Payment { .. } => write!(f, "Payment"),
        }
    }
}

/// A single ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation source; `None` means "the transaction source".
    pub source: Option<Address>,
    pub body: OperationBody,
}

impl Operation {
    pub fn create_account(destination: Address, starting_balance: u64) -> Self {
        Self {
            source: None,
            body: OperationBody::CreateAccount {
                destination,
                starting_balance,
            },
        }
    }

    pub fn payment(destination: Address, amount: u64) -> Self {
        Self {
            source: None,
            body: OperationBody::Payment {
                destination,
                amount,
            },
        }
    }

    /// Pins the operation to an explicit source account.
    pub fn with_source(mut self, source: Address) -> Self {
        self.source = Some(source);
        self
    }

    /// The account this operation debits, given the transaction source.
    pub fn effective_source<'a>(&'a self, tx_source: &'a Address) -> &'a Address {
        self.source.as_ref().unwrap_or(tx_source)
    }
}

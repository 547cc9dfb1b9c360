//! # Error Taxonomy
//!
//! Two layers of errors, kept deliberately apart:
//!
//! - [`LedgerError`]: the closed set of faults a submission can end in.
//!   Backend-derived variants carry the original [`RawFault`] and the
//!   result code that decided the classification, so an operator can
//!   always see what the ledger actually said. `ChannelBusy` and
//!   `NetworkMismatch` are synthesized locally and carry no backend data.
//! - [`SdkError`]: everything a caller can get back from this crate:
//!   a `LedgerError`, or a local validation failure that never reached the
//!   ledger (bad address, oversized memo, too many channels, ...).
//!
//! Nothing in this crate retries on its own. [`LedgerError::is_retryable`]
//! tells the caller whether trying again can help; backoff is theirs.

pub mod classify;

pub use classify::{classify, RawFault};

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::crypto::{AddressError, KeyError};
use crate::transaction::envelope::CodecError;

// ---------------------------------------------------------------------------
// FaultKind
// ---------------------------------------------------------------------------

/// Discriminant of a [`LedgerError`], without the attached diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FaultKind {
    NetworkError,
    ChannelBusy,
    AccountNotFound,
    AccountExists,
    LowBalance,
    AccountNotActivated,
    BadRequest,
    NetworkMismatch,
    InternalError,
}

impl FaultKind {
    /// Stable snake_case name, used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::ChannelBusy => "channel_busy",
            Self::AccountNotFound => "account_not_found",
            Self::AccountExists => "account_exists",
            Self::LowBalance => "low_balance",
            Self::AccountNotActivated => "account_not_activated",
            Self::BadRequest => "bad_request",
            Self::NetworkMismatch => "network_mismatch",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request counted as bad. Only `Malformed` is the caller's fault.
/// `StaleSequence` means another submission from the same source won the
/// race; rebuilding with a fresh sequence number fixes it. The rest are the
/// backend asking for patience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BadRequestReason {
    Malformed,
    StaleSequence,
    RateLimited,
    OverCapacity,
    Timeout,
}

impl fmt::Display for BadRequestReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed request"),
            Self::StaleSequence => write!(f, "stale sequence number"),
            Self::RateLimited => write!(f, "rate limited"),
            Self::OverCapacity => write!(f, "server over capacity"),
            Self::Timeout => write!(f, "timed out at backend"),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerError
// ---------------------------------------------------------------------------

/// A typed submission fault. See the module docs for the layering.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// No structured response reached the client.
    #[error("network error: {reason}")]
    Network { reason: String, fault: RawFault },

    /// Every channel in the pool is leased.
    #[error("all channels are busy")]
    ChannelBusy,

    #[error("account not found ({code})")]
    AccountNotFound { code: String, fault: RawFault },

    #[error("account already exists ({code})")]
    AccountExists { code: String, fault: RawFault },

    #[error("insufficient balance ({code})")]
    LowBalance { code: String, fault: RawFault },

    /// The account cannot hold or receive the asset yet.
    #[error("account not activated ({code})")]
    AccountNotActivated { code: String, fault: RawFault },

    #[error("bad request: {reason} ({code})")]
    BadRequest {
        reason: BadRequestReason,
        code: String,
        fault: RawFault,
    },

    /// A co-sign payload was built for a different network.
    #[error("network mismatch: configured '{expected}', payload declares '{actual}'")]
    NetworkMismatch { expected: String, actual: String },

    /// Anything the classifier does not recognize.
    #[error("internal ledger error ({code})")]
    Internal { code: String, fault: RawFault },
}

impl LedgerError {
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Network { .. } => FaultKind::NetworkError,
            Self::ChannelBusy => FaultKind::ChannelBusy,
            Self::AccountNotFound { .. } => FaultKind::AccountNotFound,
            Self::AccountExists { .. } => FaultKind::AccountExists,
            Self::LowBalance { .. } => FaultKind::LowBalance,
            Self::AccountNotActivated { .. } => FaultKind::AccountNotActivated,
            Self::BadRequest { .. } => FaultKind::BadRequest,
            Self::NetworkMismatch { .. } => FaultKind::NetworkMismatch,
            Self::Internal { .. } => FaultKind::InternalError,
        }
    }

    /// Whether the same request may succeed if the caller tries again later.
    ///
    /// `Network` is listed as retryable, but a submit that timed out may
    /// already have been applied; [`crate::client::Client::submit`] looks
    /// the hash up before handing this error back. A stale sequence only
    /// succeeds once the transaction is rebuilt, not resubmitted as is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::ChannelBusy => true,
            Self::BadRequest { reason, .. } => *reason != BadRequestReason::Malformed,
            _ => false,
        }
    }

    /// The backend response this error was classified from, if any.
    pub fn fault(&self) -> Option<&RawFault> {
        match self {
            Self::Network { fault, .. }
            | Self::AccountNotFound { fault, .. }
            | Self::AccountExists { fault, .. }
            | Self::LowBalance { fault, .. }
            | Self::AccountNotActivated { fault, .. }
            | Self::BadRequest { fault, .. }
            | Self::Internal { fault, .. } => Some(fault),
            Self::ChannelBusy | Self::NetworkMismatch { .. } => None,
        }
    }

    /// The result code that decided the classification, if any.
    pub fn result_code(&self) -> Option<&str> {
        match self {
            Self::AccountNotFound { code, .. }
            | Self::AccountExists { code, .. }
            | Self::LowBalance { code, .. }
            | Self::AccountNotActivated { code, .. }
            | Self::BadRequest { code, .. }
            | Self::Internal { code, .. } => Some(code),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SdkError
// ---------------------------------------------------------------------------

/// Top-level error for every fallible call in this crate.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("channel count {count} exceeds the maximum of {max}")]
    TooManyChannels { count: usize, max: usize },

    #[error("a channel pool needs at least one channel")]
    EmptyPool,

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid app id '{0}': expected 3-4 ASCII letters or digits")]
    InvalidAppId(String),

    #[error("memo too long: {len} bytes (max {max})")]
    MemoTooLong { len: usize, max: usize },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("transaction has no operations")]
    NoOperations,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl SdkError {
    /// The fault kind when this error came from the ledger path.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Ledger(e) => Some(e.kind()),
            _ => None,
        }
    }
}

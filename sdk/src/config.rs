//! # Policy Constants & Network Environments
//!
//! Every magic number the channel machinery depends on lives here. If you
//! are hardcoding a limit somewhere else, move it here instead.
//!
//! The [`Environment`] decides which network a client signs for. Signatures
//! are bound to the SHA-256 of the environment passphrase, so picking the
//! wrong one is not a cosmetic mistake: the ledger will reject every
//! signature and a whitelisting peer will refuse to co-sign.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256_array;

// ---------------------------------------------------------------------------
// Channel Limits
// ---------------------------------------------------------------------------

/// Upper bound on the number of channels derived from one base seed.
///
/// A hundred channels is already a hundred funded accounts to keep alive.
/// Anything larger is almost certainly a typo in a config file.
pub const MAX_CHANNELS: usize = 100;

/// Default number of channels a client derives when none is configured.
pub const DEFAULT_CHANNEL_COUNT: usize = 0;

/// Starting balance (in the ledger's smallest unit) given to each freshly
/// provisioned channel. Channels only pay fees, so this stays small.
pub const DEFAULT_CHANNEL_STARTING_BALANCE: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Fees & Reserves
// ---------------------------------------------------------------------------

/// Minimum fee per operation, in the smallest unit.
pub const DEFAULT_BASE_FEE: u64 = 100;

/// Minimum balance an account must hold to exist on the ledger.
pub const BASE_RESERVE: u64 = 500_000;

// ---------------------------------------------------------------------------
// Memo
// ---------------------------------------------------------------------------

/// Maximum memo length in bytes, including the app prefix.
pub const MAX_MEMO_LENGTH: usize = 28;

/// Version tag written at the front of every memo (`"1-app-..."`).
pub const MEMO_VERSION: u8 = 1;

/// App id used when the caller does not configure one.
pub const ANON_APP_ID: &str = "anon";

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Bech32 human-readable prefix for account addresses.
pub const ADDRESS_HRP: &str = "acct";

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// Passphrase of the production network.
pub const PRODUCTION_PASSPHRASE: &str = "Ledger Channels Mainnet ; October 2026";

/// Passphrase of the public test network.
pub const TESTNET_PASSPHRASE: &str = "Ledger Channels Testnet ; October 2026";

/// A ledger network the client talks to. Only the passphrase matters for
/// signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Short name used in logs and status output.
    pub name: String,
    /// Network passphrase. Its SHA-256 is the network id.
    pub passphrase: String,
}

impl Environment {
    /// The production network.
    pub fn production() -> Self {
        Self {
            name: "production".to_string(),
            passphrase: PRODUCTION_PASSPHRASE.to_string(),
        }
    }

    /// The public test network.
    pub fn testnet() -> Self {
        Self {
            name: "testnet".to_string(),
            passphrase: TESTNET_PASSPHRASE.to_string(),
        }
    }

    /// A private network with its own passphrase.
    pub fn custom(name: &str, passphrase: &str) -> Self {
        Self {
            name: name.to_string(),
            passphrase: passphrase.to_string(),
        }
    }

    /// Resolves `production`, `testnet`, or treats anything else as a raw
    /// passphrase for a custom network.
    pub fn from_name_or_passphrase(value: &str) -> Self {
        match value {
            "production" | "mainnet" => Self::production(),
            "testnet" => Self::testnet(),
            other => Self::custom("custom", other),
        }
    }

    /// `SHA-256(passphrase)`, mixed into every signature payload.
    pub fn network_id(&self) -> [u8; 32] {
        sha256_array(self.passphrase.as_bytes())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::testnet()
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Tunable parameters for a [`crate::client::Client`].
///
/// With `channel_count == 0` the client submits everything from the primary
/// account and never touches a pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Network the client signs for.
    pub environment: Environment,

    /// Application id written into every memo. 3-4 ASCII alphanumerics.
    pub app_id: String,

    /// Salt mixed into channel derivation. Different salts give disjoint
    /// channel sets from the same base seed.
    pub channel_salt: String,

    /// Number of channels to derive, at most [`MAX_CHANNELS`].
    pub channel_count: usize,

    /// Balance given to each channel during provisioning.
    pub channel_starting_balance: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            app_id: ANON_APP_ID.to_string(),
            channel_salt: String::new(),
            channel_count: DEFAULT_CHANNEL_COUNT,
            channel_starting_balance: DEFAULT_CHANNEL_STARTING_BALANCE,
        }
    }
}

impl ClientConfig {
    /// Sets the network environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the app id used in memos.
    pub fn app_id(mut self, app_id: &str) -> Self {
        self.app_id = app_id.to_string();
        self
    }

    /// Enables a channel pool of `count` channels derived with `salt`.
    pub fn channels(mut self, salt: &str, count: usize) -> Self {
        self.channel_salt = salt.to_string();
        self.channel_count = count;
        self
    }

    /// Sets the starting balance for provisioned channels.
    pub fn channel_starting_balance(mut self, balance: u64) -> Self {
        self.channel_starting_balance = balance;
        self
    }
}

/// Returns `true` for a valid app id: 3 or 4 ASCII letters/digits.
pub fn is_valid_app_id(app_id: &str) -> bool {
    (3..=4).contains(&app_id.len()) && app_id.chars().all(|c| c.is_ascii_alphanumeric())
}

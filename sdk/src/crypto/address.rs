//! # Account Addresses
//!
//! An address is the raw Ed25519 public key, Bech32-encoded under the
//! `acct` prefix:
//!
//! ```text
//! public_key (32 bytes) -> Bech32("acct", public_key) -> acct1q...
//! ```
//!
//! The key is encoded directly (not hashed) because the ledger needs it to
//! verify signatures from the address alone. Bech32's checksum catches the
//! copy-paste mistakes that would otherwise send funds to nowhere.

use bech32::{Bech32, Hrp};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::keys::PublicKey;
use crate::config::ADDRESS_HRP;

/// Errors raised while parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    #[error("invalid address prefix: expected '{expected}', got '{got}'")]
    InvalidHrp { expected: String, got: String },

    #[error("invalid address payload: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("address does not encode a valid Ed25519 public key")]
    InvalidKey,
}

/// A ledger account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    public_key: PublicKey,
}

impl Address {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self {
            public_key: *public_key,
        }
    }

    /// Parse and validate a Bech32 address.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let (hrp, data) =
            bech32::decode(s).map_err(|e| AddressError::Bech32Decode(e.to_string()))?;

        if hrp.as_str() != ADDRESS_HRP {
            return Err(AddressError::InvalidHrp {
                expected: ADDRESS_HRP.to_string(),
                got: hrp.to_string(),
            });
        }
        if data.len() != 32 {
            return Err(AddressError::InvalidLength(data.len()));
        }

        let public_key = PublicKey::try_from_slice(&data).map_err(|_| AddressError::InvalidKey)?;
        Ok(Self { public_key })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Canonical string form.
    pub fn encode(&self) -> String {
        let hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, self.public_key.as_bytes())
            .expect("encoding a 32-byte payload should never fail")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}

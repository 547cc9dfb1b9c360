//! Whitelist co-signing.
//!
//! A third party (typically an app server) sometimes has to authorize a
//! transaction it did not build: the client signs its own envelope, sends
//! it over, and gets it back with one more signature. The co-signer never
//! submits and never edits anything; it checks the declared network and
//! appends its signature.

use serde::{Deserialize, Serialize};

use super::envelope::TransactionEnvelope;
use super::signing::sign_envelope;
use crate::config::Environment;
use crate::crypto::Keypair;
use crate::error::{LedgerError, SdkError};

/// What a client sends to be whitelisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistPayload {
    /// Hex-encoded [`TransactionEnvelope`].
    pub envelope: String,
    /// Passphrase of the network the envelope was built for.
    pub network_id: String,
}

impl WhitelistPayload {
    pub fn new(envelope: &TransactionEnvelope, environment: &Environment) -> Result<Self, SdkError> {
        Ok(Self {
            envelope: envelope.to_hex()?,
            network_id: environment.passphrase.clone(),
        })
    }
}

/// Adds `keypair`'s signature to the payload's envelope and returns the
/// re-encoded envelope (hex).
///
/// Fails with [`LedgerError::NetworkMismatch`] when the payload was built
/// for another network; a signature there would be worthless at best.
pub fn cosign(
    payload: &WhitelistPayload,
    keypair: &Keypair,
    environment: &Environment,
) -> Result<String, SdkError> {
    if payload.network_id != environment.passphrase {
        return Err(LedgerError::NetworkMismatch {
            expected: environment.passphrase.clone(),
            actual: payload.network_id.clone(),
        }
        .into());
    }

    let mut envelope = TransactionEnvelope::from_hex(&payload.envelope)?;
    sign_envelope(&mut envelope, keypair, &environment.network_id());
    tracing::debug!(
        signer = %keypair.address(),
        signatures = envelope.signatures.len(),
        "whitelisted transaction"
    );
    Ok(envelope.to_hex()?)
}

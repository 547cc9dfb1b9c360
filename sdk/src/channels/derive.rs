//! Deterministic channel derivation.
//!
//! Operators should not have to back up channel secrets. Given the primary
//! seed and a salt, the same channels come out every time:
//!
//! ```text
//! hashed_salt = SHA-256(salt)
//! seed_i      = SHA-256(base_seed || hashed_salt || decimal(i))
//! channel_i   = Ed25519 keypair from seed_i
//! ```
//!
//! Each index is derived on its own (no running state), so asking for more
//! channels later only appends to the list: the first `n` never change.

use crate::config::MAX_CHANNELS;
use crate::crypto::hash::{sha256_array, sha256_concat};
use crate::crypto::Keypair;
use crate::error::SdkError;

/// Derive `count` channel keypairs from `base_seed` and `salt`.
///
/// Fails with [`SdkError::TooManyChannels`] when `count` exceeds
/// [`MAX_CHANNELS`]. `count == 0` yields an empty list.
pub fn derive_channel_keypairs(
    base_seed: &[u8; 32],
    salt: &str,
    count: usize,
) -> Result<Vec<Keypair>, SdkError> {
    if count > MAX_CHANNELS {
        return Err(SdkError::TooManyChannels {
            count,
            max: MAX_CHANNELS,
        });
    }

    let hashed_salt = sha256_array(salt.as_bytes());
    let channels = (0..count)
        .map(|i| {
            let index = i.to_string();
            let seed = sha256_concat(&[
                base_seed.as_slice(),
                hashed_salt.as_slice(),
                index.as_bytes(),
            ]);
            Keypair::from_seed(&seed)
        })
        .collect();

    Ok(channels)
}

/// Convenience wrapper taking the primary keypair instead of its raw seed.
pub fn derive_from_keypair(
    primary: &Keypair,
    salt: &str,
    count: usize,
) -> Result<Vec<Keypair>, SdkError> {
    derive_channel_keypairs(&primary.secret_bytes(), salt, count)
}

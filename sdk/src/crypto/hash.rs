//! SHA-256 helpers.
//!
//! Channel derivation, network ids, and transaction hashes all use
//! SHA-256. The two helpers differ only in the return type: callers that
//! feed the digest into a seed want `[u8; 32]`, callers that keep
//! concatenating want a `Vec<u8>`.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data as a `Vec<u8>`.
///
/// ```
/// use ledger_channels::crypto::sha256;
///
/// assert_eq!(sha256(b"channels").len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha256::digest(data));
    output
}

/// SHA-256 over several parts, as if they were concatenated.
///
/// Saves the caller from building a temporary buffer just to hash it.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

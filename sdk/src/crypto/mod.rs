//! # Cryptographic Primitives
//!
//! Every key, signature, and hash the channel machinery touches flows
//! through here. Nothing clever happens in this module:
//!
//! - **Ed25519** for account keys and signatures (`ed25519-dalek`).
//! - **SHA-256** for channel derivation, network ids, and transaction
//!   hashes (`sha2`).
//! - **Bech32** for human-facing account addresses (`bech32`).
//!
//! If you are tempted to add another primitive, it probably belongs in
//! the ledger collaborator, not here.

pub mod address;
pub mod hash;
pub mod keys;

pub use address::{Address, AddressError};
pub use hash::{sha256, sha256_array};
pub use keys::{KeyError, Keypair, PublicKey, Signature};

// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Channels: Client-Side Submission Coordination
//!
//! A ledger that orders each account's transactions with a strictly
//! increasing sequence number punishes concurrency: two submissions from the
//! same account race, and one of them loses. This crate absorbs that
//! contention with a fixed pool of auxiliary *channel* accounts. Each
//! in-flight transaction borrows one channel as its nominal source (and
//! therefore its sequence number), while the operations still belong to the
//! application account.
//!
//! ## Architecture
//!
//! The crate is split along the actual concerns of a submitting client:
//!
//! - **crypto**: Ed25519 keys, SHA-256, and checksummed account addresses.
//! - **channels**: Deterministic channel derivation and the lease pool.
//! - **transaction**: Building, network-bound signing, envelopes, and
//!   whitelist co-signing.
//! - **error**: The closed fault taxonomy and the backend fault classifier.
//! - **ledger**: Narrow traits for the ledger collaborators, plus an
//!   in-memory ledger for tests and demos.
//! - **client**: The submission coordinator and channel provisioning.
//! - **metrics**: Prometheus counters for leases and submissions.
//! - **config**: Policy constants and network environments.
//!
//! ## Ground rules
//!
//! 1. A channel is held by at most one caller at a time, and is always
//!    released, whatever the caller's body does.
//! 2. The same base seed and salt always derive the same channels.
//! 3. Every backend fault is translated into [`error::LedgerError`] the
//!    moment it is received. Nothing retries behind the caller's back.

pub mod channels;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod transaction;

pub use channels::{derive_channel_keypairs, Channel, ChannelLease, ChannelPool, PoolStatus};
pub use client::{Client, ClientStatus, PendingTransaction};
pub use config::{ClientConfig, Environment};
pub use crypto::{Address, Keypair};
pub use error::{classify, FaultKind, LedgerError, RawFault, SdkError};
pub use ledger::{AccountOracle, InMemoryLedger, LedgerSubmitter};

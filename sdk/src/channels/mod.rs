//! # Channels
//!
//! A channel is an extra funded account whose only job is to be the source
//! of a transaction, so that the sequence number of one channel is consumed
//! per in-flight submission instead of the app account's single sequence.
//! With `K` channels an app can have `K` submissions in flight at once.
//!
//! ```text
//! derive.rs  deterministic keypairs from (base seed, salt, index)
//! pool.rs    exclusive, non-blocking leasing with guaranteed release
//! ```

pub mod derive;
pub mod pool;

pub use derive::{derive_channel_keypairs, derive_from_keypair};
pub use pool::{Channel, ChannelLease, ChannelPool, ChannelState, ChannelStatus, PoolStatus};

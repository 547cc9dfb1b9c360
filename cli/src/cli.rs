//! # CLI Interface
//!
//! `clap` derive definitions for the `channels` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Deterministic channel accounts and whitelist co-signing.
#[derive(Parser, Debug)]
#[command(
    name = "channels",
    about = "Channel-account tooling for ledger submission",
    version,
    propagate_version = true
)]
pub struct ChannelsCli {
    /// Log format: pretty or json.
    #[arg(long, global = true, env = "CHANNELS_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the channel accounts derived from a base seed and salt.
    Derive(DeriveArgs),
    /// Generate a fresh random keypair.
    Keygen,
    /// Co-sign a whitelist payload (JSON file) and print the envelope.
    Cosign(CosignArgs),
    /// Run concurrent payments through a channel pool on an in-memory
    /// ledger and report what happened.
    Demo(DemoArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// Hex-encoded 32-byte base seed (the primary account's secret).
    #[arg(long, env = "CHANNELS_BASE_SEED", hide_env_values = true)]
    pub base_seed: String,

    /// Salt selecting the channel set.
    #[arg(long, env = "CHANNELS_SALT", default_value = "")]
    pub salt: String,

    /// How many channels to derive (at most 100).
    #[arg(long, short = 'n', default_value_t = 10)]
    pub count: usize,

    /// Also print each channel's secret.
    #[arg(long)]
    pub secrets: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CosignArgs {
    /// Hex-encoded secret of the co-signing account.
    #[arg(long, env = "CHANNELS_BASE_SEED", hide_env_values = true)]
    pub secret: String,

    /// Network name (production, testnet) or a custom passphrase.
    #[arg(long, env = "CHANNELS_NETWORK", default_value = "testnet")]
    pub network: String,

    /// Path to a JSON file with `envelope` and `network_id` fields.
    #[arg(long, short = 'p')]
    pub payload: PathBuf,
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Number of channels in the pool.
    #[arg(long, default_value_t = 4)]
    pub channels: usize,

    /// Number of concurrent payments.
    #[arg(long, default_value_t = 10)]
    pub payments: usize,

    /// Simulated ledger latency per submission, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub latency_ms: u64,

    /// Channel salt.
    #[arg(long, env = "CHANNELS_SALT", default_value = "demo")]
    pub salt: String,

    /// Network name (production, testnet) or a custom passphrase.
    #[arg(long, env = "CHANNELS_NETWORK", default_value = "testnet")]
    pub network: String,
}

// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # channels
//!
//! Operator tooling around `ledger-channels`:
//!
//! - `derive`: list the deterministic channel accounts for a seed and salt
//! - `keygen`: generate a keypair
//! - `cosign`: whitelist a transaction payload
//! - `demo`: concurrent payments through a channel pool, in memory
//! - `version`: print build version information

mod cli;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;

use ledger_channels::config::MAX_CHANNELS;
use ledger_channels::transaction::WhitelistPayload;
use ledger_channels::{
    derive_channel_keypairs, Address, Client, ClientConfig, Environment, InMemoryLedger, Keypair,
    SdkError,
};

use cli::{ChannelsCli, Commands};
use logging::LogFormat;

/// Attempts per payment in the demo before giving up on a retryable fault.
const DEMO_MAX_ATTEMPTS: u32 = 8;

/// First backoff delay in the demo; doubles per attempt.
const DEMO_INITIAL_BACKOFF: Duration = Duration::from_millis(25);

const DEMO_PRIMARY_FUNDS: u64 = 10_000_000_000;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ChannelsCli::parse();
    logging::init_logging(
        "channels=info,ledger_channels=info",
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::Derive(args) => derive(args),
        Commands::Keygen => {
            keygen();
            Ok(())
        }
        Commands::Cosign(args) => cosign(args),
        Commands::Demo(args) => demo(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn derive(args: cli::DeriveArgs) -> Result<()> {
    let primary = Keypair::from_secret_hex(&args.base_seed).context("invalid base seed")?;
    let channels = derive_channel_keypairs(&primary.secret_bytes(), &args.salt, args.count)
        .context("channel derivation failed")?;

    if args.json {
        let entries: Vec<_> = channels
            .iter()
            .enumerate()
            .map(|(index, k)| {
                let mut entry = serde_json::json!({
                    "index": index,
                    "address": k.address().to_string(),
                });
                if args.secrets {
                    entry["secret"] = serde_json::Value::String(k.secret_hex());
                }
                entry
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (index, k) in channels.iter().enumerate() {
        if args.secrets {
            println!("{index:>3}  {}  {}", k.address(), k.secret_hex());
        } else {
            println!("{index:>3}  {}", k.address());
        }
    }
    Ok(())
}

fn keygen() {
    let keypair = Keypair::random();
    println!("Address : {}", keypair.address());
    println!("Secret  : {}", keypair.secret_hex());
}

fn cosign(args: cli::CosignArgs) -> Result<()> {
    let keypair = Keypair::from_secret_hex(&args.secret).context("invalid secret")?;
    let environment = Environment::from_name_or_passphrase(&args.network);

    let raw = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("failed to read payload from {}", args.payload.display()))?;
    let payload: WhitelistPayload =
        serde_json::from_str(&raw).context("payload is not a whitelist JSON document")?;

    let envelope = ledger_channels::transaction::cosign(&payload, &keypair, &environment)
        .context("co-signing failed")?;
    println!("{envelope}");
    Ok(())
}

/// Provisions a pool on an in-memory ledger and pushes concurrent payments
/// through it, retrying retryable faults with exponential backoff.
async fn demo(args: cli::DemoArgs) -> Result<()> {
    let environment = Environment::from_name_or_passphrase(&args.network);
    let ledger = Arc::new(
        InMemoryLedger::new(&environment).with_latency(Duration::from_millis(args.latency_ms)),
    );

    let primary = Keypair::random();
    ledger.fund(&primary.address(), DEMO_PRIMARY_FUNDS);
    let recipient = Keypair::random().address();
    ledger.fund(&recipient, DEMO_PRIMARY_FUNDS);

    let config = ClientConfig::default()
        .environment(environment)
        .app_id("demo")
        .channels(&args.salt, args.channels);
    let client = Client::with_ledger(primary, config, Arc::clone(&ledger))
        .context("failed to create client")?;

    if let Some(hash) = client
        .ensure_channels_funded()
        .await
        .context("channel provisioning failed")?
    {
        tracing::info!(%hash, "channels provisioned");
    }

    let started = std::time::Instant::now();
    let payments = (0..args.payments).map(|i| pay_with_backoff(&client, &recipient, 1 + i as u64));
    let results = join_all(payments).await;
    let elapsed = started.elapsed();

    let failed = results.iter().filter(|r| r.is_err()).count();
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(hash) => println!("payment {i:>3}  ok      {hash}"),
            Err(e) => println!("payment {i:>3}  failed  {e}"),
        }
    }

    println!();
    println!(
        "{} payments, {} failed, {:.2?} elapsed",
        results.len(),
        failed,
        elapsed
    );
    println!();
    for tx in ledger.history() {
        println!(
            "ledger {:>4}  {}  ops={}  {}",
            tx.ledger,
            tx.applied_at.format("%H:%M:%S%.3f"),
            tx.operations,
            tx.source
        );
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&client.status())?);
    println!();
    print!("{}", client.metrics().encode_text());
    Ok(())
}

async fn pay_with_backoff(client: &Client, to: &Address, amount: u64) -> Result<String, SdkError> {
    let mut delay = DEMO_INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match client.send_payment(to, amount, Some("demo")).await {
            Err(SdkError::Ledger(e)) if e.is_retryable() && attempt < DEMO_MAX_ATTEMPTS => {
                tracing::debug!(attempt, kind = %e.kind(), "retrying payment");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn print_version() {
    println!("channels     {}", env!("CARGO_PKG_VERSION"));
    println!("max channels {}", MAX_CHANNELS);
    println!("rustc        {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}

//! End-to-end tests for channel-based submission.
//!
//! Every test runs a real [`Client`] against its own [`InMemoryLedger`]:
//! deterministic channel derivation, provisioning, leasing under
//! concurrency, building, signing, submission, fault classification, and
//! whitelist co-signing. No shared state between tests.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use ledger_channels::config::{DEFAULT_BASE_FEE, DEFAULT_CHANNEL_STARTING_BALANCE};
use ledger_channels::ledger::LedgerSubmitter;
use ledger_channels::transaction::{
    sign_envelope, Operation, TransactionBuilder, TransactionEnvelope, WhitelistPayload,
};
use ledger_channels::{
    Address, ChannelPool, Client, ClientConfig, Environment, FaultKind, InMemoryLedger, Keypair,
    LedgerError, SdkError,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const APP_FUNDS: u64 = 1_000_000_000;

/// A funded app account with `channels` provisioned channels.
async fn provisioned_client(
    seed: [u8; 32],
    channels: usize,
    latency: Option<Duration>,
) -> (Arc<InMemoryLedger>, Client) {
    let env = Environment::testnet();
    let mut ledger = InMemoryLedger::new(&env);
    if let Some(latency) = latency {
        ledger = ledger.with_latency(latency);
    }
    let ledger = Arc::new(ledger);

    let keypair = Keypair::from_seed(&seed);
    ledger.fund(&keypair.address(), APP_FUNDS);

    let config = ClientConfig::default()
        .environment(env)
        .app_id("e2e")
        .channels("e2e-salt", channels);
    let client = Client::with_ledger(keypair, config, Arc::clone(&ledger)).expect("client");
    client.ensure_channels_funded().await.expect("provisioning");
    (ledger, client)
}

fn recipient(ledger: &InMemoryLedger) -> Address {
    let address = Keypair::random().address();
    ledger.fund(&address, DEFAULT_CHANNEL_STARTING_BALANCE);
    address
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_channel_two_concurrent_bodies() {
    let pool = ChannelPool::new(vec![Keypair::random()]).unwrap();

    let body = || {
        pool.acquire(|channel| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, SdkError>(channel.address())
        })
    };
    let (first, second) = tokio::join!(body(), body());

    assert!(first.is_ok());
    assert_eq!(
        second.unwrap_err().fault_kind(),
        Some(FaultKind::ChannelBusy)
    );

    let status = pool.status();
    assert_eq!(status.free, 1);
    assert_eq!(status.busy, 0);
}

#[tokio::test]
async fn pool_busy_error_carries_no_backend_fault() {
    let pool = ChannelPool::new(vec![Keypair::random()]).unwrap();
    let _held = pool.try_lease().unwrap();

    let err = pool.try_lease().unwrap_err();
    assert!(matches!(err, LedgerError::ChannelBusy));
    assert!(err.fault().is_none());
    assert!(err.is_retryable());
}

// ---------------------------------------------------------------------------
// Submission through channels
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_payments_use_every_channel_once() {
    let (ledger, client) =
        provisioned_client([1u8; 32], 4, Some(Duration::from_millis(50))).await;
    let dest = recipient(&ledger);

    let payments = (0..4).map(|i| client.send_payment(&dest, 1_000 + i, Some("batch")));
    let results = join_all(payments).await;
    for result in &results {
        assert!(result.is_ok(), "{result:?}");
    }

    for channel in client.pool().unwrap().addresses() {
        assert_eq!(ledger.sequence_of(&channel), Some(1));
    }
    assert_eq!(
        ledger.balance_of(&dest),
        Some(DEFAULT_CHANNEL_STARTING_BALANCE + 4_006)
    );
    // Provisioning plus four payments; the app account sequence moved once.
    assert_eq!(ledger.history().len(), 5);
    assert_eq!(ledger.sequence_of(&client.public_address()), Some(1));
    assert_eq!(client.channels_status().unwrap().free, 4);
}

#[tokio::test]
async fn one_payment_too_many_gets_channel_busy() {
    let (ledger, client) =
        provisioned_client([2u8; 32], 3, Some(Duration::from_millis(50))).await;
    let dest = recipient(&ledger);

    let results = join_all((0..4).map(|_| client.send_payment(&dest, 10, None))).await;

    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.fault_kind() == Some(FaultKind::ChannelBusy)))
        .count();
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(busy, 1);
    assert_eq!(ok, 3);
    assert_eq!(client.channels_status().unwrap().busy, 0);
    assert!(client
        .metrics()
        .encode_text()
        .contains("channels_channel_busy_total 1"));
}

#[tokio::test]
async fn channel_sourced_payment_is_attributed_to_app() {
    let (ledger, client) = provisioned_client([3u8; 32], 1, None).await;
    let dest = recipient(&ledger);
    let channel = client.pool().unwrap().addresses()[0];
    let app_before = ledger.balance_of(&client.public_address()).unwrap();

    client.send_payment(&dest, 5_000, None).await.unwrap();

    // The app pays the amount, the channel pays the fee.
    assert_eq!(
        ledger.balance_of(&client.public_address()),
        Some(app_before - 5_000)
    );
    assert_eq!(
        ledger.balance_of(&channel),
        Some(DEFAULT_CHANNEL_STARTING_BALANCE - DEFAULT_BASE_FEE)
    );
}

#[tokio::test]
async fn failed_submission_classifies_and_releases() {
    let (ledger, client) = provisioned_client([4u8; 32], 2, None).await;
    let dest = recipient(&ledger);

    let err = client
        .send_payment(&dest, APP_FUNDS * 2, None)
        .await
        .unwrap_err();
    match err {
        SdkError::Ledger(ref e) => {
            assert_eq!(e.kind(), FaultKind::LowBalance);
            assert_eq!(e.result_code(), Some("op_underfunded"));
            assert!(!e.is_retryable());
            assert_eq!(e.fault().and_then(|f| f.status), Some(400));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.channels_status().unwrap().free, 2);
}

#[tokio::test]
async fn lost_response_on_channel_path_is_recovered() {
    let (ledger, client) = provisioned_client([5u8; 32], 1, None).await;
    let dest = recipient(&ledger);
    ledger.drop_next_responses(1);

    let hash = client.send_payment(&dest, 1, None).await.unwrap();

    assert_eq!(ledger.history().last().unwrap().hash, hash);
    assert_eq!(client.channels_status().unwrap().free, 1);
}

// ---------------------------------------------------------------------------
// Restart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restart_rederives_the_same_channels() {
    let (ledger, first) = provisioned_client([6u8; 32], 5, None).await;
    let submissions = ledger.submission_count();

    let config = ClientConfig::default()
        .app_id("e2e")
        .channels("e2e-salt", 5);
    let restarted =
        Client::with_ledger(Keypair::from_seed(&[6u8; 32]), config, Arc::clone(&ledger)).unwrap();

    assert_eq!(
        restarted.pool().unwrap().addresses(),
        first.pool().unwrap().addresses()
    );
    assert_eq!(restarted.ensure_channels_funded().await.unwrap(), None);
    assert_eq!(ledger.submission_count(), submissions);
}

#[tokio::test]
async fn growing_the_pool_only_provisions_new_channels() {
    let (ledger, small) = provisioned_client([7u8; 32], 3, None).await;

    let config = ClientConfig::default()
        .app_id("e2e")
        .channels("e2e-salt", 6);
    let large =
        Client::with_ledger(Keypair::from_seed(&[7u8; 32]), config, Arc::clone(&ledger)).unwrap();

    let small_addrs = small.pool().unwrap().addresses();
    let large_addrs = large.pool().unwrap().addresses();
    assert_eq!(&large_addrs[..3], small_addrs.as_slice());

    large.ensure_channels_funded().await.unwrap();
    let history = ledger.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].operations, 3);
}

// ---------------------------------------------------------------------------
// Whitelisting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn whitelisted_transaction_is_accepted() {
    let env = Environment::testnet();
    let ledger = Arc::new(InMemoryLedger::new(&env));
    let app = Keypair::random();
    let user = Keypair::random();
    let dest = recipient(&ledger);
    ledger.fund(&app.address(), APP_FUNDS);
    ledger.fund(&user.address(), DEFAULT_CHANNEL_STARTING_BALANCE);

    let app_client =
        Client::with_ledger(app.clone(), ClientConfig::default(), Arc::clone(&ledger)).unwrap();

    // The user pays the fee, the app pays the amount: both must sign.
    let tx = TransactionBuilder::new(user.address())
        .fee(DEFAULT_BASE_FEE)
        .sequence(1)
        .memo("1-anon-wl")
        .operation(Operation::payment(dest, 700).with_source(app.address()))
        .build()
        .unwrap();
    let mut envelope = TransactionEnvelope::new(tx);
    sign_envelope(&mut envelope, &user, &env.network_id());

    let unsigned_by_app = envelope.to_bytes().unwrap();
    assert!(ledger.submit(&unsigned_by_app).await.is_err());

    let payload = WhitelistPayload::new(&envelope, &env).unwrap();
    let cosigned = app_client.whitelist_transaction(&payload).unwrap();
    let bytes = TransactionEnvelope::from_hex(&cosigned)
        .unwrap()
        .to_bytes()
        .unwrap();

    ledger.submit(&bytes).await.unwrap();
    assert_eq!(
        ledger.balance_of(&dest),
        Some(DEFAULT_CHANNEL_STARTING_BALANCE + 700)
    );
}

//! # Submission Coordinator
//!
//! [`Client`] builds, signs, and submits transactions for one application
//! account, optionally routing each one through a leased channel.
//!
//! ## Channel-sourced transactions
//!
//! ```text
//! tx.source        = channel      (pays the fee, consumes its sequence)
//! op.source        = app account  (the ledger attributes the operation to it)
//! signatures       = [channel, app account]
//! ```
//!
//! Sequence numbers are loaded fresh for every build. Nothing built here is
//! reused: a failed submission is rebuilt by the caller, never resubmitted.

mod provision;

use std::sync::Arc;

use serde::Serialize;

use crate::channels::{derive_from_keypair, Channel, ChannelPool, PoolStatus};
use crate::config::{is_valid_app_id, ClientConfig, MEMO_VERSION};
use crate::crypto::{Address, Keypair};
use crate::error::{classify, FaultKind, LedgerError, RawFault, SdkError};
use crate::ledger::{AccountOracle, LedgerSubmitter};
use crate::metrics::SdkMetrics;
use crate::transaction::{
    cosign, sign_envelope, Operation, TransactionBuilder, TransactionEnvelope, WhitelistPayload,
};

/// A built and fully signed transaction, ready for [`Client::submit`].
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub envelope: TransactionEnvelope,
    /// Hex hash under the client's network; what the ledger will report.
    pub hash: String,
    /// The channel used as source, if any.
    pub channel: Option<Address>,
}

/// Snapshot of a client's identity and pool.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    pub app_id: String,
    pub public_address: String,
    pub network: String,
    pub channels: Option<PoolStatus>,
}

/// Client-side submission coordinator for one application account.
pub struct Client {
    config: ClientConfig,
    keypair: Keypair,
    network_id: [u8; 32],
    oracle: Arc<dyn AccountOracle>,
    submitter: Arc<dyn LedgerSubmitter>,
    pool: Option<ChannelPool>,
    metrics: Arc<SdkMetrics>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("app_id", &self.config.app_id)
            .field("address", &self.keypair.address())
            .field("network", &self.config.environment.name)
            .field("pool", &self.pool)
            .finish()
    }
}

impl Client {
    /// Creates a client. When `config.channel_count > 0` the channels are
    /// derived from `keypair` and `config.channel_salt`; they still have to
    /// exist on the ledger (see [`Client::ensure_channels_funded`]).
    pub fn new(
        keypair: Keypair,
        config: ClientConfig,
        oracle: Arc<dyn AccountOracle>,
        submitter: Arc<dyn LedgerSubmitter>,
    ) -> Result<Self, SdkError> {
        if !is_valid_app_id(&config.app_id) {
            return Err(SdkError::InvalidAppId(config.app_id));
        }

        let metrics = Arc::new(SdkMetrics::new());
        let pool = if config.channel_count > 0 {
            let channels =
                derive_from_keypair(&keypair, &config.channel_salt, config.channel_count)?;
            Some(ChannelPool::new(channels)?.with_metrics(Arc::clone(&metrics)))
        } else {
            None
        };

        tracing::info!(
            address = %keypair.address(),
            app_id = %config.app_id,
            network = %config.environment.name,
            channels = config.channel_count,
            "client initialized"
        );

        Ok(Self {
            network_id: config.environment.network_id(),
            config,
            keypair,
            oracle,
            submitter,
            pool,
            metrics,
        })
    }

    /// Creates a client whose oracle and submitter are the same backend.
    pub fn with_ledger<L>(keypair: Keypair, config: ClientConfig, ledger: Arc<L>) -> Result<Self, SdkError>
    where
        L: AccountOracle + LedgerSubmitter + 'static,
    {
        let oracle: Arc<dyn AccountOracle> = ledger.clone();
        let submitter: Arc<dyn LedgerSubmitter> = ledger;
        Self::new(keypair, config, oracle, submitter)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<SdkMetrics> {
        &self.metrics
    }

    pub fn pool(&self) -> Option<&ChannelPool> {
        self.pool.as_ref()
    }

    pub fn network_id(&self) -> &[u8; 32] {
        &self.network_id
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn public_address(&self) -> Address {
        self.keypair.address()
    }

    /// Balance of the application account.
    pub async fn balance(&self) -> Result<u64, SdkError> {
        let account = self
            .oracle
            .load_account(&self.keypair.address())
            .await
            .map_err(|f| self.fault(f))?;
        Ok(account.balance)
    }

    pub async fn account_exists(&self, address: &Address) -> Result<bool, SdkError> {
        self.oracle
            .account_exists(address)
            .await
            .map_err(|f| self.fault(f))
    }

    /// Minimum fee per operation.
    pub async fn minimum_fee(&self) -> Result<u64, SdkError> {
        self.oracle.minimum_fee().await.map_err(|f| self.fault(f))
    }

    pub fn channels_status(&self) -> Option<PoolStatus> {
        self.pool.as_ref().map(ChannelPool::status)
    }

    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            app_id: self.config.app_id.clone(),
            public_address: self.keypair.address().to_string(),
            network: self.config.environment.name.clone(),
            channels: self.channels_status(),
        }
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Builds and signs a transaction creating `destination`.
    pub async fn build_create_account(
        &self,
        destination: &Address,
        starting_balance: u64,
        fee: u64,
        memo: Option<&str>,
        channel: Option<&Channel>,
    ) -> Result<PendingTransaction, SdkError> {
        let op = Operation::create_account(*destination, starting_balance);
        self.build(vec![op], fee, memo, channel).await
    }

    /// Builds and signs a payment to `destination`.
    pub async fn build_send_payment(
        &self,
        destination: &Address,
        amount: u64,
        fee: u64,
        memo: Option<&str>,
        channel: Option<&Channel>,
    ) -> Result<PendingTransaction, SdkError> {
        let op = Operation::payment(*destination, amount);
        self.build(vec![op], fee, memo, channel).await
    }

    async fn build(
        &self,
        operations: Vec<Operation>,
        fee: u64,
        memo: Option<&str>,
        channel: Option<&Channel>,
    ) -> Result<PendingTransaction, SdkError> {
        let app = self.keypair.address();
        let (source, operations) = match channel {
            Some(ch) => (
                ch.address(),
                operations.into_iter().map(|op| op.with_source(app)).collect(),
            ),
            None => (app, operations),
        };

        let account = self
            .oracle
            .load_account(&source)
            .await
            .map_err(|f| self.fault(f))?;

        let tx = TransactionBuilder::new(source)
            .fee(fee)
            .sequence(account.sequence + 1)
            .memo(&self.memo(memo))
            .operations(operations)
            .build()?;

        let mut envelope = TransactionEnvelope::new(tx);
        if let Some(ch) = channel {
            sign_envelope(&mut envelope, ch.keypair(), &self.network_id);
        }
        sign_envelope(&mut envelope, &self.keypair, &self.network_id);

        let hash = envelope.tx.hash_hex(&self.network_id);
        tracing::debug!(%hash, %source, sequence = envelope.tx.sequence, "transaction built");

        Ok(PendingTransaction {
            envelope,
            hash,
            channel: channel.map(Channel::address),
        })
    }

    fn memo(&self, text: Option<&str>) -> String {
        format!(
            "{}-{}-{}",
            MEMO_VERSION,
            self.config.app_id,
            text.unwrap_or_default()
        )
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    /// Submits a pending transaction and returns the ledger's hash.
    ///
    /// Faults are classified on receipt. A [`FaultKind::NetworkError`] is
    /// followed by one lookup of the transaction hash: if the ledger has
    /// already applied it, the submission counts as successful.
    pub async fn submit(&self, tx: PendingTransaction) -> Result<String, SdkError> {
        let bytes = tx.envelope.to_bytes()?;
        self.metrics.submissions_total.inc();

        let fault = match self.submitter.submit(&bytes).await {
            Ok(response) => {
                tracing::info!(hash = %response.hash, ledger = response.ledger, "transaction submitted");
                return Ok(response.hash);
            }
            Err(fault) => fault,
        };

        let error = classify(&fault);
        if error.kind() == FaultKind::NetworkError {
            match self.submitter.transaction_status(&tx.hash).await {
                Ok(Some(response)) => {
                    tracing::info!(
                        hash = %response.hash,
                        ledger = response.ledger,
                        "submit response lost, transaction found on ledger"
                    );
                    return Ok(response.hash);
                }
                Ok(None) => {}
                Err(lookup) => {
                    tracing::debug!(?lookup, "transaction lookup after network error failed")
                }
            }
        }
        Err(self.record(error))
    }

    /// Co-signs a payload built by someone else, for this client's network.
    pub fn whitelist_transaction(&self, payload: &WhitelistPayload) -> Result<String, SdkError> {
        cosign(payload, &self.keypair, &self.config.environment)
    }

    // -----------------------------------------------------------------------
    // Convenience
    // -----------------------------------------------------------------------

    /// Creates `destination` with `starting_balance` at the minimum fee,
    /// through a leased channel when a pool is configured.
    pub async fn create_account(
        &self,
        destination: &Address,
        starting_balance: u64,
        memo: Option<&str>,
    ) -> Result<String, SdkError> {
        let fee = self.minimum_fee().await?;
        match &self.pool {
            Some(pool) => {
                pool.acquire(|channel| async move {
                    let tx = self
                        .build_create_account(destination, starting_balance, fee, memo, Some(&channel))
                        .await?;
                    self.submit(tx).await
                })
                .await
            }
            None => {
                let tx = self
                    .build_create_account(destination, starting_balance, fee, memo, None)
                    .await?;
                self.submit(tx).await
            }
        }
    }

    /// Pays `amount` to `destination` at the minimum fee, through a leased
    /// channel when a pool is configured.
    pub async fn send_payment(
        &self,
        destination: &Address,
        amount: u64,
        memo: Option<&str>,
    ) -> Result<String, SdkError> {
        let fee = self.minimum_fee().await?;
        match &self.pool {
            Some(pool) => {
                pool.acquire(|channel| async move {
                    let tx = self
                        .build_send_payment(destination, amount, fee, memo, Some(&channel))
                        .await?;
                    self.submit(tx).await
                })
                .await
            }
            None => {
                let tx = self
                    .build_send_payment(destination, amount, fee, memo, None)
                    .await?;
                self.submit(tx).await
            }
        }
    }

    // -----------------------------------------------------------------------
    // Faults
    // -----------------------------------------------------------------------

    fn fault(&self, fault: RawFault) -> SdkError {
        self.record(classify(&fault))
    }

    fn record(&self, error: LedgerError) -> SdkError {
        self.metrics.record_fault(error.kind());
        tracing::warn!(
            kind = %error.kind(),
            code = error.result_code().unwrap_or("-"),
            retryable = error.is_retryable(),
            "ledger fault"
        );
        error.into()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, DEFAULT_BASE_FEE};
    use crate::error::BadRequestReason;
    use crate::ledger::InMemoryLedger;
    use crate::transaction::has_signature_from;

    const FUNDS: u64 = 100_000_000;

    fn setup(config: ClientConfig) -> (Arc<InMemoryLedger>, Client) {
        let ledger = Arc::new(InMemoryLedger::new(&config.environment));
        let keypair = Keypair::random();
        ledger.fund(&keypair.address(), FUNDS);
        let client = Client::with_ledger(keypair, config, Arc::clone(&ledger)).unwrap();
        (ledger, client)
    }

    fn funded_recipient(ledger: &InMemoryLedger) -> Address {
        let address = Keypair::random().address();
        ledger.fund(&address, FUNDS);
        address
    }

    #[test]
    fn rejects_invalid_app_id() {
        let ledger = Arc::new(InMemoryLedger::new(&Environment::testnet()));
        let err = Client::with_ledger(
            Keypair::random(),
            ClientConfig::default().app_id("no!"),
            ledger,
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::InvalidAppId(id) if id == "no!"));
    }

    #[test]
    fn rejects_too_many_channels() {
        let ledger = Arc::new(InMemoryLedger::new(&Environment::testnet()));
        let err = Client::with_ledger(
            Keypair::random(),
            ClientConfig::default().channels("s", 101),
            ledger,
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::TooManyChannels { .. }));
    }

    #[test]
    fn pool_is_derived_from_primary_seed() {
        let keypair = Keypair::from_seed(&[3u8; 32]);
        let ledger = Arc::new(InMemoryLedger::new(&Environment::testnet()));
        let client = Client::with_ledger(
            keypair.clone(),
            ClientConfig::default().channels("pool", 4),
            ledger,
        )
        .unwrap();

        let expected: Vec<Address> = derive_from_keypair(&keypair, "pool", 4)
            .unwrap()
            .iter()
            .map(Keypair::address)
            .collect();
        assert_eq!(client.pool().unwrap().addresses(), expected);
    }

    #[tokio::test]
    async fn build_without_channel_uses_primary() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);

        let pending = client
            .build_send_payment(&dest, 10, DEFAULT_BASE_FEE, Some("hi"), None)
            .await
            .unwrap();

        let tx = &pending.envelope.tx;
        assert_eq!(tx.source, client.public_address());
        assert_eq!(tx.sequence, 1);
        assert_eq!(tx.memo.as_deref(), Some("1-anon-hi"));
        assert_eq!(tx.operations[0].source, None);
        assert_eq!(pending.envelope.signatures.len(), 1);
        assert_eq!(pending.channel, None);
    }

    #[tokio::test]
    async fn build_with_channel_splits_sources_and_signs_twice() {
        let (ledger, client) = setup(ClientConfig::default().app_id("demo"));
        let dest = funded_recipient(&ledger);
        let channel = Channel::new(Keypair::random());
        ledger.fund(&channel.address(), FUNDS);

        let pending = client
            .build_send_payment(&dest, 10, DEFAULT_BASE_FEE, None, Some(&channel))
            .await
            .unwrap();

        let env = &pending.envelope;
        assert_eq!(env.tx.source, channel.address());
        assert_eq!(env.tx.operations[0].source, Some(client.public_address()));
        assert_eq!(env.tx.memo.as_deref(), Some("1-demo-"));
        assert!(has_signature_from(env, &channel.address(), client.network_id()));
        assert!(has_signature_from(env, &client.public_address(), client.network_id()));
        assert_eq!(pending.channel, Some(channel.address()));
    }

    #[tokio::test]
    async fn build_fetches_sequence_fresh() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);

        let first = client
            .build_send_payment(&dest, 1, DEFAULT_BASE_FEE, None, None)
            .await
            .unwrap();
        client.submit(first).await.unwrap();

        let second = client
            .build_send_payment(&dest, 1, DEFAULT_BASE_FEE, None, None)
            .await
            .unwrap();
        assert_eq!(second.envelope.tx.sequence, 2);
    }

    #[tokio::test]
    async fn build_rejects_long_memo() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);
        let err = client
            .build_send_payment(&dest, 1, DEFAULT_BASE_FEE, Some("this memo is far too long"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::MemoTooLong { .. }));
    }

    #[tokio::test]
    async fn build_for_missing_channel_is_account_not_found() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);
        let channel = Channel::new(Keypair::random());

        let err = client
            .build_send_payment(&dest, 1, DEFAULT_BASE_FEE, None, Some(&channel))
            .await
            .unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::AccountNotFound));
    }

    #[tokio::test]
    async fn submit_returns_ledger_hash() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);

        let pending = client
            .build_send_payment(&dest, 250, DEFAULT_BASE_FEE, None, None)
            .await
            .unwrap();
        let expected = pending.hash.clone();

        assert_eq!(client.submit(pending).await.unwrap(), expected);
        assert_eq!(ledger.balance_of(&dest), Some(FUNDS + 250));
        assert_eq!(client.metrics().submissions_total.get(), 1);
    }

    #[tokio::test]
    async fn submit_classifies_and_counts_faults() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);
        ledger.inject_fault(RawFault::problem(429, "rate_limit_exceeded"));

        let pending = client
            .build_send_payment(&dest, 1, DEFAULT_BASE_FEE, None, None)
            .await
            .unwrap();
        let err = client.submit(pending).await.unwrap_err();

        assert!(matches!(
            err,
            SdkError::Ledger(LedgerError::BadRequest {
                reason: BadRequestReason::RateLimited,
                ..
            })
        ));
        assert!(client
            .metrics()
            .encode_text()
            .contains("channels_submission_faults_total{kind=\"bad_request\"} 1"));
    }

    #[tokio::test]
    async fn lost_response_is_resolved_by_lookup() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);
        ledger.drop_next_responses(1);

        let pending = client
            .build_send_payment(&dest, 5, DEFAULT_BASE_FEE, None, None)
            .await
            .unwrap();
        let expected = pending.hash.clone();

        assert_eq!(client.submit(pending).await.unwrap(), expected);
        assert_eq!(ledger.history().len(), 1);
    }

    #[tokio::test]
    async fn unapplied_network_error_surfaces() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);
        ledger.inject_fault(RawFault::transport("timed out"));

        let pending = client
            .build_send_payment(&dest, 5, DEFAULT_BASE_FEE, None, None)
            .await
            .unwrap();
        let err = client.submit(pending).await.unwrap_err();

        assert_eq!(err.fault_kind(), Some(FaultKind::NetworkError));
        assert!(ledger.history().is_empty());
    }

    #[tokio::test]
    async fn send_payment_without_pool() {
        let (ledger, client) = setup(ClientConfig::default());
        let dest = funded_recipient(&ledger);

        client.send_payment(&dest, 42, Some("tip")).await.unwrap();
        assert_eq!(ledger.balance_of(&dest), Some(FUNDS + 42));
        assert!(client.channels_status().is_none());
    }

    #[tokio::test]
    async fn send_payment_failure_releases_channel() {
        let (ledger, client) = setup(ClientConfig::default().channels("t", 2));
        client.ensure_channels_funded().await.unwrap();

        let nowhere = Keypair::random().address();
        let err = client.send_payment(&nowhere, 1, None).await.unwrap_err();

        assert_eq!(err.fault_kind(), Some(FaultKind::AccountNotFound));
        assert_eq!(client.channels_status().unwrap().free, 2);
        assert!(ledger.sequence_of(&client.public_address()).is_some());
    }

    #[tokio::test]
    async fn create_account_through_channel() {
        let (ledger, client) = setup(ClientConfig::default().channels("t", 1));
        client.ensure_channels_funded().await.unwrap();
        let channel = client.pool().unwrap().addresses()[0];
        let fresh = Keypair::random().address();

        client.create_account(&fresh, 2_000_000, None).await.unwrap();

        assert_eq!(ledger.balance_of(&fresh), Some(2_000_000));
        assert_eq!(ledger.sequence_of(&channel), Some(1));
        assert_eq!(ledger.history().last().unwrap().source, channel);
    }

    #[test]
    fn whitelist_uses_client_network() {
        let ledger = Arc::new(InMemoryLedger::new(&Environment::testnet()));
        let client =
            Client::with_ledger(Keypair::random(), ClientConfig::default(), ledger).unwrap();

        let tx = TransactionBuilder::new(Keypair::random().address())
            .fee(DEFAULT_BASE_FEE)
            .sequence(1)
            .operation(Operation::payment(Keypair::random().address(), 1))
            .build()
            .unwrap();
        let envelope = TransactionEnvelope::new(tx);

        let foreign = WhitelistPayload::new(&envelope, &Environment::production()).unwrap();
        let err = client.whitelist_transaction(&foreign).unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::NetworkMismatch));

        let local = WhitelistPayload::new(&envelope, &Environment::testnet()).unwrap();
        let signed = TransactionEnvelope::from_hex(&client.whitelist_transaction(&local).unwrap())
            .unwrap();
        assert!(has_signature_from(&signed, &client.public_address(), client.network_id()));
    }

    #[tokio::test]
    async fn status_reports_identity_and_pool() {
        let (ledger, client) = setup(ClientConfig::default().app_id("abc").channels("t", 3));
        assert_eq!(client.balance().await.unwrap(), FUNDS);
        assert!(client.account_exists(&client.public_address()).await.unwrap());
        assert_eq!(client.minimum_fee().await.unwrap(), DEFAULT_BASE_FEE);
        drop(ledger);

        let json = serde_json::to_value(client.status()).unwrap();
        assert_eq!(json["app_id"], "abc");
        assert_eq!(json["network"], "testnet");
        assert_eq!(json["channels"]["total"], 3);
        assert_eq!(json["public_address"], client.public_address().to_string());
    }
}

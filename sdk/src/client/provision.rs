//! Channel provisioning.
//!
//! Channels have to exist on the ledger before they can be transaction
//! sources. Provisioning creates the missing ones from the application
//! account in a single batched transaction, and is safe to run on every
//! start: on a warm start it costs two existence checks and nothing else.

use futures::future::try_join_all;

use super::Client;
use crate::crypto::Address;
use crate::error::SdkError;
use crate::transaction::Operation;

impl Client {
    /// Makes sure every configured channel exists, funding missing ones
    /// with `config.channel_starting_balance`.
    ///
    /// Returns the hash of the funding transaction, or `None` when nothing
    /// had to be created (including when no pool is configured).
    pub async fn ensure_channels_funded(&self) -> Result<Option<String>, SdkError> {
        let Some(pool) = self.pool() else {
            return Ok(None);
        };
        let channels = pool.addresses();
        self.ensure_accounts_funded(&channels, self.config.channel_starting_balance)
            .await
    }

    /// Creates every account in `identities` that does not exist yet, in one
    /// transaction sourced from the application account.
    ///
    /// If the first and the last identity both exist the batch is assumed
    /// complete and nothing else is checked. Otherwise each identity is
    /// checked, and the fee is the minimum fee times the number of accounts
    /// actually created. Faults are classified and returned, not retried.
    pub async fn ensure_accounts_funded(
        &self,
        identities: &[Address],
        starting_balance: u64,
    ) -> Result<Option<String>, SdkError> {
        let (Some(first), Some(last)) = (identities.first(), identities.last()) else {
            return Ok(None);
        };

        if self.account_exists(first).await? && self.account_exists(last).await? {
            tracing::info!(count = identities.len(), "channels already provisioned");
            return Ok(None);
        }

        let exists = try_join_all(identities.iter().map(|a| self.account_exists(a))).await?;
        let missing: Vec<Address> = identities
            .iter()
            .zip(exists)
            .filter(|(_, exists)| !exists)
            .map(|(address, _)| *address)
            .collect();

        if missing.is_empty() {
            tracing::info!(count = identities.len(), "channels already provisioned");
            return Ok(None);
        }

        let fee = self.minimum_fee().await? * missing.len() as u64;
        let operations = missing
            .iter()
            .map(|address| Operation::create_account(*address, starting_balance))
            .collect();

        tracing::info!(
            missing = missing.len(),
            total = identities.len(),
            starting_balance,
            fee,
            "provisioning channels"
        );

        let tx = self.build(operations, fee, None, None).await?;
        let hash = self.submit(tx).await?;
        Ok(Some(hash))
    }
}

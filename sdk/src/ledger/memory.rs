//! In-memory ledger.
//!
//! Applies the rules a real ledger enforces on submission, and reports
//! violations in the same problem-document shape, so classification and the
//! channel machinery are exercised end to end without a network:
//!
//! - the source account must exist (`tx_no_source_account`)
//! - `sequence` must be exactly the source's current sequence plus one
//!   (`tx_bad_seq`)
//! - `fee` must cover the minimum fee per operation (`tx_insufficient_fee`)
//! - every required signer must have signed for this network
//!   (`tx_bad_auth`)
//! - the source must be able to pay the fee (`tx_insufficient_balance`)
//!
//! Once those pass, the fee is charged and the sequence consumed. Operations
//! then apply all-or-nothing: if any fails, none of their effects stick and
//! the per-operation codes come back under `tx_failed`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use super::{AccountInfo, AccountOracle, LedgerSubmitter, SubmitResponse};
use crate::config::{Environment, BASE_RESERVE, DEFAULT_BASE_FEE};
use crate::crypto::Address;
use crate::error::RawFault;
use crate::transaction::{missing_signers, OperationBody, TransactionEnvelope};

const OP_SUCCESS: &str = "op_success";

#[derive(Debug, Clone)]
struct AccountEntry {
    sequence: u64,
    balance: u64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<Address, AccountEntry>,
    ledger: u64,
}

/// A transaction the ledger accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedTransaction {
    pub hash: String,
    pub ledger: u64,
    pub source: Address,
    pub operations: usize,
    pub applied_at: DateTime<Utc>,
}

/// A single-process ledger implementing both collaborator traits.
pub struct InMemoryLedger {
    network_id: [u8; 32],
    minimum_fee: u64,
    base_reserve: u64,
    latency: Option<Duration>,
    state: Mutex<LedgerState>,
    transactions: DashMap<String, AppliedTransaction>,
    injected: Mutex<VecDeque<RawFault>>,
    dropped_responses: AtomicUsize,
    submissions: AtomicU64,
}

impl InMemoryLedger {
    pub fn new(environment: &Environment) -> Self {
        Self {
            network_id: environment.network_id(),
            minimum_fee: DEFAULT_BASE_FEE,
            base_reserve: BASE_RESERVE,
            latency: None,
            state: Mutex::new(LedgerState::default()),
            transactions: DashMap::new(),
            injected: Mutex::new(VecDeque::new()),
            dropped_responses: AtomicUsize::new(0),
            submissions: AtomicU64::new(0),
        }
    }

    /// Raises (or lowers) the minimum fee charged per operation.
    pub fn with_minimum_fee(mut self, fee: u64) -> Self {
        self.minimum_fee = fee;
        self
    }

    /// Delays every submission by `latency` before it is applied.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Creates `address` with `balance`, or tops it up if it exists.
    pub fn fund(&self, address: &Address, balance: u64) {
        let mut state = self.state.lock();
        state
            .accounts
            .entry(*address)
            .and_modify(|a| a.balance += balance)
            .or_insert_with(|| AccountEntry {
                sequence: 0,
                balance,
                created_at: Utc::now(),
            });
    }

    pub fn balance_of(&self, address: &Address) -> Option<u64> {
        self.state.lock().accounts.get(address).map(|a| a.balance)
    }

    pub fn sequence_of(&self, address: &Address) -> Option<u64> {
        self.state.lock().accounts.get(address).map(|a| a.sequence)
    }

    pub fn created_at(&self, address: &Address) -> Option<DateTime<Utc>> {
        self.state.lock().accounts.get(address).map(|a| a.created_at)
    }

    /// The next submission fails with `fault` without touching the ledger.
    /// Faults queue up and are consumed one per submission.
    pub fn inject_fault(&self, fault: RawFault) {
        self.injected.lock().push_back(fault);
    }

    /// The next `n` submissions are applied, but the caller gets a
    /// transport failure instead of the response.
    pub fn drop_next_responses(&self, n: usize) {
        self.dropped_responses.fetch_add(n, Ordering::SeqCst);
    }

    /// Calls to [`LedgerSubmitter::submit`], accepted or not.
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Accepted transactions in ledger order.
    pub fn history(&self) -> Vec<AppliedTransaction> {
        let mut applied: Vec<_> = self.transactions.iter().map(|t| t.value().clone()).collect();
        applied.sort_by_key(|t| t.ledger);
        applied
    }

    fn apply(&self, envelope: &TransactionEnvelope) -> Result<SubmitResponse, RawFault> {
        let tx = &envelope.tx;
        let mut state = self.state.lock();

        let Some(source) = state.accounts.get(&tx.source) else {
            return Err(RawFault::transaction_failed("tx_no_source_account", &[]));
        };
        if tx.sequence != source.sequence + 1 {
            return Err(RawFault::transaction_failed("tx_bad_seq", &[]));
        }
        if tx.fee < self.minimum_fee * tx.operations.len() as u64 {
            return Err(RawFault::transaction_failed("tx_insufficient_fee", &[]));
        }
        if !missing_signers(envelope, &self.network_id).is_empty() {
            return Err(RawFault::transaction_failed("tx_bad_auth", &[]));
        }
        if source.balance < tx.fee {
            return Err(RawFault::transaction_failed("tx_insufficient_balance", &[]));
        }

        if let Some(source) = state.accounts.get_mut(&tx.source) {
            source.sequence += 1;
            source.balance -= tx.fee;
        }

        let mut scratch = state.accounts.clone();
        let codes: Vec<&str> = tx
            .operations
            .iter()
            .map(|op| {
                apply_operation(
                    &mut scratch,
                    op.effective_source(&tx.source),
                    &op.body,
                    self.base_reserve,
                )
            })
            .collect();

        if codes.iter().any(|c| *c != OP_SUCCESS) {
            tracing::debug!(source = %tx.source, ?codes, "in-memory ledger rejected operations");
            return Err(RawFault::transaction_failed("tx_failed", &codes));
        }

        state.accounts = scratch;
        state.ledger += 1;

        let hash = tx.hash_hex(&self.network_id);
        let applied = AppliedTransaction {
            hash: hash.clone(),
            ledger: state.ledger,
            source: tx.source,
            operations: tx.operations.len(),
            applied_at: Utc::now(),
        };
        self.transactions.insert(hash.clone(), applied);

        Ok(SubmitResponse {
            hash,
            ledger: state.ledger,
        })
    }
}

fn apply_operation(
    accounts: &mut HashMap<Address, AccountEntry>,
    source: &Address,
    body: &OperationBody,
    reserve: u64,
) -> &'static str {
    let Some(available) = accounts.get(source).map(|a| a.balance) else {
        return "op_no_source_account";
    };

    match body {
        OperationBody::CreateAccount {
            destination,
            starting_balance,
        } => {
            if accounts.contains_key(destination) {
                return "op_already_exists";
            }
            if *starting_balance < reserve {
                return "op_low_reserve";
            }
            if available < starting_balance.saturating_add(reserve) {
                return "op_underfunded";
            }
            debit(accounts, source, *starting_balance);
            accounts.insert(
                *destination,
                AccountEntry {
                    sequence: 0,
                    balance: *starting_balance,
                    created_at: Utc::now(),
                },
            );
        }
        OperationBody::Payment {
            destination,
            amount,
        } => {
            if !accounts.contains_key(destination) {
                return "op_no_destination";
            }
            if available < amount.saturating_add(reserve) {
                return "op_underfunded";
            }
            debit(accounts, source, *amount);
            if let Some(dest) = accounts.get_mut(destination) {
                dest.balance += amount;
            }
        }
    }
    OP_SUCCESS
}

fn debit(accounts: &mut HashMap<Address, AccountEntry>, address: &Address, amount: u64) {
    if let Some(account) = accounts.get_mut(address) {
        account.balance -= amount;
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

#[async_trait]
impl AccountOracle for InMemoryLedger {
    async fn load_account(&self, address: &Address) -> Result<AccountInfo, RawFault> {
        let state = self.state.lock();
        match state.accounts.get(address) {
            Some(account) => Ok(AccountInfo {
                address: *address,
                sequence: account.sequence,
                balance: account.balance,
            }),
            None => Err(RawFault::problem(404, "not_found")),
        }
    }

    async fn account_exists(&self, address: &Address) -> Result<bool, RawFault> {
        Ok(self.state.lock().accounts.contains_key(address))
    }

    async fn minimum_fee(&self) -> Result<u64, RawFault> {
        Ok(self.minimum_fee)
    }
}

#[async_trait]
impl LedgerSubmitter for InMemoryLedger {
    async fn submit(&self, envelope: &[u8]) -> Result<SubmitResponse, RawFault> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(fault) = self.injected.lock().pop_front() {
            return Err(fault);
        }

        let envelope = TransactionEnvelope::from_bytes(envelope)
            .map_err(|_| RawFault::problem(400, "transaction_malformed"))?;
        let response = self.apply(&envelope)?;

        let dropped = self
            .dropped_responses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(RawFault::transport("connection reset after submit"));
        }
        Ok(response)
    }

    async fn transaction_status(&self, hash: &str) -> Result<Option<SubmitResponse>, RawFault> {
        Ok(self.transactions.get(hash).map(|t| SubmitResponse {
            hash: t.hash.clone(),
            ledger: t.ledger,
        }))
    }
}

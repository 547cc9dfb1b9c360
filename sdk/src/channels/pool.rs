//! The channel lease pool.
//!
//! A fixed list of channels, each `Free` or `Busy`. A caller leases one
//! channel, uses it as the source of exactly one in-flight transaction, and
//! gives it back. The pool never blocks and never queues: if every channel
//! is busy the caller hears about it immediately as
//! [`LedgerError::ChannelBusy`] and decides for itself when to try again.
//!
//! ## Locking
//!
//! One `parking_lot::Mutex` guards the state list. It is held only for the
//! select-and-mark step and the release step, never across the caller's
//! body or any network call, so a slow submission cannot stall other
//! callers' leases.
//!
//! ## Release guarantee
//!
//! A lease is a [`ChannelLease`] guard; dropping it frees the channel. That
//! covers a body that returns `Ok`, returns `Err`, panics, or is cancelled
//! by dropping its future.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::crypto::{Address, Keypair};
use crate::error::{LedgerError, SdkError};
use crate::metrics::SdkMetrics;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Lease state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Free,
    Busy,
}

/// A channel account handed to a lease holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    keypair: Keypair,
}

impl Channel {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

struct Slot {
    channel: Channel,
    state: ChannelState,
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// One channel in a [`PoolStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub address: String,
    pub state: ChannelState,
}

/// An owned snapshot of the pool. Editing it changes nothing in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub total: usize,
    pub free: usize,
    pub busy: usize,
    pub channels: Vec<ChannelStatus>,
}

// ---------------------------------------------------------------------------
// ChannelPool
// ---------------------------------------------------------------------------

/// A fixed set of channels with exclusive, guaranteed-release leasing.
pub struct ChannelPool {
    slots: Mutex<Vec<Slot>>,
    metrics: Option<Arc<SdkMetrics>>,
}

impl std::fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("ChannelPool")
            .field("total", &status.total)
            .field("free", &status.free)
            .finish()
    }
}

impl ChannelPool {
    /// Builds a pool with every channel free. The order of `keypairs` is
    /// kept; provisioning depends on it.
    pub fn new(keypairs: Vec<Keypair>) -> Result<Self, SdkError> {
        if keypairs.is_empty() {
            return Err(SdkError::EmptyPool);
        }
        let slots = keypairs
            .into_iter()
            .map(|keypair| Slot {
                channel: Channel::new(keypair),
                state: ChannelState::Free,
            })
            .collect();
        Ok(Self {
            slots: Mutex::new(slots),
            metrics: None,
        })
    }

    /// Builds a pool from hex-encoded channel secrets.
    pub fn from_secrets<S: AsRef<str>>(secrets: &[S]) -> Result<Self, SdkError> {
        let keypairs = secrets
            .iter()
            .map(|s| Keypair::from_secret_hex(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(keypairs)
    }

    /// Records lease activity into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<SdkMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Channel keypairs in pool order, regardless of lease state.
    pub fn keypairs(&self) -> Vec<Keypair> {
        self.slots
            .lock()
            .iter()
            .map(|s| s.channel.keypair.clone())
            .collect()
    }

    /// Channel addresses in pool order.
    pub fn addresses(&self) -> Vec<Address> {
        self.slots.lock().iter().map(|s| s.channel.address()).collect()
    }

    /// Leases a random free channel, or fails immediately with
    /// [`LedgerError::ChannelBusy`].
    ///
    /// The channel is marked busy before this returns and freed when the
    /// returned guard is dropped.
    pub fn try_lease(&self) -> Result<ChannelLease<'_>, LedgerError> {
        let (index, channel) = {
            let mut slots = self.slots.lock();
            let free: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.state == ChannelState::Free)
                .map(|(i, _)| i)
                .collect();

            let Some(&index) = free.choose(&mut rand::thread_rng()) else {
                drop(slots);
                if let Some(m) = &self.metrics {
                    m.channel_busy_total.inc();
                }
                tracing::warn!("no free channel available");
                return Err(LedgerError::ChannelBusy);
            };

            slots[index].state = ChannelState::Busy;
            (index, slots[index].channel.clone())
        };

        if let Some(m) = &self.metrics {
            m.leases_acquired_total.inc();
            m.channels_busy.inc();
        }
        tracing::debug!(channel = %channel.address(), index, "channel leased");

        Ok(ChannelLease {
            pool: self,
            index,
            channel,
        })
    }

    /// Runs `body` with an exclusively leased channel.
    ///
    /// The channel is freed when `body`'s future completes, whatever its
    /// outcome, and also if the returned future is dropped early or the
    /// body panics. Pool exhaustion surfaces as `E::from(ChannelBusy)`
    /// without running `body`.
    pub async fn acquire<F, Fut, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(Channel) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LedgerError>,
    {
        let lease = self.try_lease().map_err(E::from)?;
        let result = body(lease.channel().clone()).await;
        drop(lease);
        result
    }

    /// Copies the current pool state.
    pub fn status(&self) -> PoolStatus {
        let slots = self.slots.lock();
        let channels: Vec<ChannelStatus> = slots
            .iter()
            .map(|s| ChannelStatus {
                address: s.channel.address().to_string(),
                state: s.state,
            })
            .collect();
        let busy = channels
            .iter()
            .filter(|c| c.state == ChannelState::Busy)
            .count();
        PoolStatus {
            total: channels.len(),
            free: channels.len() - busy,
            busy,
            channels,
        }
    }

    fn release(&self, index: usize) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(index) {
            slot.state = ChannelState::Free;
        }
        drop(slots);

        if let Some(m) = &self.metrics {
            m.channels_busy.dec();
        }
        tracing::debug!(index, "channel released");
    }
}

// ---------------------------------------------------------------------------
// ChannelLease
// ---------------------------------------------------------------------------

/// An exclusive hold on one channel. Dropping it frees the channel.
#[must_use = "dropping the lease frees the channel immediately"]
pub struct ChannelLease<'a> {
    pool: &'a ChannelPool,
    index: usize,
    channel: Channel,
}

impl ChannelLease<'_> {
    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

impl std::fmt::Debug for ChannelLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChannelLease({})", self.channel.address())
    }
}

impl Drop for ChannelLease<'_> {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! # Prometheus Metrics
//!
//! Lease and submission counters for whoever embeds the client. All metrics
//! live in a dedicated [`prometheus::Registry`] under the `channels`
//! namespace so they do not collide with the host application's own.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::FaultKind;

/// Metric handles shared by the pool and the client.
///
/// Cheap to clone: prometheus handles are reference-counted internally.
#[derive(Clone)]
pub struct SdkMetrics {
    registry: Registry,
    /// Leases handed out by the pool.
    pub leases_acquired_total: IntCounter,
    /// Lease attempts rejected because every channel was busy.
    pub channel_busy_total: IntCounter,
    /// Channels currently leased.
    pub channels_busy: IntGauge,
    /// Envelopes handed to the ledger submitter.
    pub submissions_total: IntCounter,
    /// Classified submission faults, labelled by fault kind.
    pub submission_faults_total: IntCounterVec,
}

impl SdkMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("channels".into()), None)
            .expect("failed to create prometheus registry");

        let leases_acquired_total =
            IntCounter::new("leases_acquired_total", "Channel leases handed out")
                .expect("metric creation");
        registry
            .register(Box::new(leases_acquired_total.clone()))
            .expect("metric registration");

        let channel_busy_total = IntCounter::new(
            "channel_busy_total",
            "Lease attempts rejected because no channel was free",
        )
        .expect("metric creation");
        registry
            .register(Box::new(channel_busy_total.clone()))
            .expect("metric registration");

        let channels_busy = IntGauge::new("channels_busy", "Channels currently leased")
            .expect("metric creation");
        registry
            .register(Box::new(channels_busy.clone()))
            .expect("metric registration");

        let submissions_total = IntCounter::new(
            "submissions_total",
            "Transaction envelopes handed to the ledger",
        )
        .expect("metric creation");
        registry
            .register(Box::new(submissions_total.clone()))
            .expect("metric registration");

        let submission_faults_total = IntCounterVec::new(
            Opts::new(
                "submission_faults_total",
                "Classified submission faults by kind",
            ),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(submission_faults_total.clone()))
            .expect("metric registration");

        Self {
            registry,
            leases_acquired_total,
            channel_busy_total,
            channels_busy,
            submissions_total,
            submission_faults_total,
        }
    }

    pub fn record_fault(&self, kind: FaultKind) {
        self.submission_faults_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Renders every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for SdkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

//! Prometheus metrics for the bridge.

use std::fmt::Write;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

/// Default Prometheus client buckets, in seconds.
const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Result of a transaction attempt.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Failed => "failed",
        }
    }
}

impl EncodeLabelValue for Outcome {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), std::fmt::Error> {
        encoder.write_str(self.as_str())
    }
}

/// Sink for the write path's observations.
///
/// Constructed once at startup and handed to the writer, so tests can
/// substitute a recording implementation.
pub trait Observer: Send + Sync {
    /// Count samples received in a series, before its rows are written.
    fn record_samples(&self, count: u64);

    /// Record how long a transaction took from begin to commit return.
    fn record_duration(&self, destination: &str, outcome: Outcome, seconds: f64);
}

/// Labels for the transaction duration histogram.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TransactionLabels {
    pub remote: String,
    pub result: Outcome,
}

/// Container for all Prometheus metrics.
pub struct Metrics {
    registry: Registry,

    /// Counter of samples received via remote write.
    pub received_samples: Counter,

    /// Histogram of store transaction latency in seconds.
    pub sent_transactions_duration_seconds: Family<TransactionLabels, Histogram>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics registry with all metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        // Exposed as received_samples_total
        let received_samples = Counter::default();
        registry.register(
            "received_samples",
            "Total number of samples received via remote write",
            received_samples.clone(),
        );

        let sent_transactions_duration_seconds =
            Family::<TransactionLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DEFAULT_BUCKETS.into_iter())
            });
        registry.register(
            "clickhouse_sent_transactions_duration_seconds",
            "Duration of store transactions by destination and result",
            sent_transactions_duration_seconds.clone(),
        );

        Self {
            registry,
            received_samples,
            sent_transactions_duration_seconds,
        }
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)
            .expect("encoding metrics should not fail");
        buffer
    }
}

impl Observer for Metrics {
    fn record_samples(&self, count: u64) {
        self.received_samples.inc_by(count);
    }

    fn record_duration(&self, destination: &str, outcome: Outcome, seconds: f64) {
        self.sent_transactions_duration_seconds
            .get_or_create(&TransactionLabels {
                remote: destination.to_string(),
                result: outcome,
            })
            .observe(seconds);
    }
}

//! Prometheus Metrics Module
//!
//! Exposes pipeline metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Producer**: feed events read, events published, publish failures
//! - **Consumer**: records polled, decode outcomes, poll/commit failures
//! - **Stats**: dropped updates, snapshot save outcomes
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the consumer's HTTP server. The
//! recording helpers are no-ops until [`init_metrics`] installs the
//! recorder, so the producer binary may record counters without exporting
//! them.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "producer_events_consumed_total",
        "Number of events read from the change-event feed"
    );
    describe_counter!(
        "producer_events_persisted_total",
        "Number of events acknowledged by the broker"
    );
    describe_counter!(
        "producer_publish_failures_total",
        "Number of events that failed to publish"
    );
    describe_counter!(
        "producer_malformed_lines_total",
        "Number of feed lines skipped as malformed"
    );

    describe_counter!(
        "consumer_events_consumed_total",
        "Number of records polled from the broker"
    );
    describe_counter!(
        "consumer_events_processed_success_total",
        "Number of records decoded successfully"
    );
    describe_counter!(
        "consumer_events_processed_failed_total",
        "Number of records skipped as undecodable"
    );
    describe_counter!(
        "consumer_poll_errors_total",
        "Number of transport errors surfaced by broker polls"
    );
    describe_counter!(
        "consumer_commit_failures_total",
        "Number of offset commits that failed"
    );

    describe_counter!(
        "stats_updates_dropped_total",
        "Number of updates dropped because the stats queue was full"
    );
    describe_counter!(
        "stats_snapshots_saved_total",
        "Number of snapshot saves that succeeded"
    );
    describe_counter!(
        "stats_snapshot_save_failures_total",
        "Number of snapshot saves that failed"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record one event read from the feed.
pub fn record_feed_event() {
    counter!("producer_events_consumed_total").increment(1);
}

/// Record one event acknowledged by the broker.
pub fn record_event_published() {
    counter!("producer_events_persisted_total").increment(1);
}

/// Record one failed publication.
pub fn record_publish_failure() {
    counter!("producer_publish_failures_total").increment(1);
}

/// Record one malformed feed line.
pub fn record_malformed_line() {
    counter!("producer_malformed_lines_total").increment(1);
}

/// Record records polled from the broker.
pub fn record_records_polled(count: u64) {
    counter!("consumer_events_consumed_total").increment(count);
}

/// Record one successfully decoded record.
pub fn record_decode_success() {
    counter!("consumer_events_processed_success_total").increment(1);
}

/// Record one record skipped as undecodable.
pub fn record_decode_failure() {
    counter!("consumer_events_processed_failed_total").increment(1);
}

/// Record one transport error surfaced by a poll.
pub fn record_poll_error() {
    counter!("consumer_poll_errors_total").increment(1);
}

/// Record one failed offset commit.
pub fn record_commit_failure() {
    counter!("consumer_commit_failures_total").increment(1);
}

/// Record one dropped stats update.
pub fn record_update_dropped() {
    counter!("stats_updates_dropped_total").increment(1);
}

/// Record one successful snapshot save.
pub fn record_snapshot_saved() {
    counter!("stats_snapshots_saved_total").increment(1);
}

/// Record one failed snapshot save.
pub fn record_snapshot_save_failure() {
    counter!("stats_snapshot_save_failures_total").increment(1);
}

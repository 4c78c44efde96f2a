//! Broker Consume Loop
//!
//! Polls the broker for record batches, decodes each record independently,
//! hands the decoded batch to the stats sink, and commits consumption
//! progress.
//!
//! # Offset semantics
//!
//! Offsets are committed right after the batch has been handed off to the
//! sink, not after it has been durably applied or persisted. Because the
//! hand-off is a non-blocking enqueue, a crash between "enqueue accepted"
//! and "batch persisted" can lose updates whose offsets were already
//! committed. This is the source design's deliberate throughput/latency
//! trade-off, kept as-is; see `commit_precedes_persistence` in the tests.
//!
//! Multiple instances of this loop may run concurrently against the same
//! consumer-group identity to parallelize across partitions; each instance
//! is an independent control loop sharing only the downstream sink.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{BrokerSource, RawRecord, StatsSink};
use crate::domain::event::ChangeEvent;
use crate::infrastructure::{metrics, wire};

/// Run one consume loop until the cancellation token fires.
///
/// Transport errors on a poll are logged and the poll is retried; the
/// records of an errored poll are discarded. Decode failures skip the
/// affected record only. Commit failures are logged, never retried, and
/// never fatal: the broker's at-least-once redelivery covers the gap.
pub async fn run_consume_loop(
    source: Arc<dyn BrokerSource>,
    sink: Arc<dyn StatsSink>,
    cancel: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("consume loop cancelled");
                return;
            }
            batch = source.poll() => batch,
        };

        if !batch.errors.is_empty() {
            for error in &batch.errors {
                metrics::record_poll_error();
                tracing::warn!(%error, "fetch error");
            }
            continue;
        }

        if batch.records.is_empty() {
            continue;
        }

        metrics::record_records_polled(batch.records.len() as u64);
        let events = decode_records(&batch.records);
        for event in events {
            sink.enqueue(event);
        }

        if let Err(error) = source.commit(&batch.records).await {
            metrics::record_commit_failure();
            tracing::warn!(%error, "failed to commit offsets");
        }
    }
}

/// Decode every record independently; failures are skipped, not fatal.
fn decode_records(records: &[RawRecord]) -> Vec<ChangeEvent> {
    let mut batch = Vec::with_capacity(records.len());

    for record in records {
        match wire::decode(&record.payload) {
            Ok(event) => {
                metrics::record_decode_success();
                batch.push(event);
            }
            Err(error) => {
                metrics::record_decode_failure();
                tracing::warn!(
                    %error,
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    "failed to decode record, skipping"
                );
            }
        }
    }

    batch
}

// =============================================================================
// Tests
// =============================================================================

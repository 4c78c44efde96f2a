//! Broker Adapters
//!
//! rdkafka-backed implementations of the [`EventPublisher`] and
//! [`BrokerSource`] ports.
//!
//! - [`KafkaPublisher`] wraps a `FutureProducer`; `publish` enqueues the
//!   record and observes the delivery acknowledgement on a detached task
//!   that only logs failures.
//! - [`KafkaSource`] wraps a `StreamConsumer` configured for manual offset
//!   commits; `poll` blocks for the first record then opportunistically
//!   drains more up to a batch bound, and `commit` advances the highest
//!   polled offset per partition.

use std::collections::HashMap;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Message, Offset, TopicPartitionList};

use crate::application::ports::{
    BrokerError, BrokerSource, EventPublisher, PolledBatch, RawRecord,
};
use crate::infrastructure::metrics;

/// Upper bound on records returned by one poll.
const MAX_POLL_RECORDS: usize = 500;

/// How long one poll keeps draining after its first record.
const POLL_DRAIN_WAIT: Duration = Duration::from_millis(10);

// =============================================================================
// Publisher
// =============================================================================

/// Fire-and-forget publisher onto one broker topic.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    /// Create a producer client for the given brokers and topic.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Construction`] if the client cannot be
    /// created; fatal to producer startup.
    pub fn new(brokers: &str, topic: impl Into<String>) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| BrokerError::Construction(e.to_string()))?;

        Ok(Self {
            producer,
            topic: topic.into(),
        })
    }
}

impl EventPublisher for KafkaPublisher {
    fn publish(&self, payload: Vec<u8>) {
        let record = FutureRecord::<(), _>::to(&self.topic).payload(&payload);

        match self.producer.send_result(record) {
            Ok(delivery) => {
                // Acknowledgement only affects logging; the reader is
                // never blocked on it.
                tokio::spawn(async move {
                    match delivery.await {
                        Ok(Ok(_)) => metrics::record_event_published(),
                        Ok(Err((error, _message))) => {
                            metrics::record_publish_failure();
                            tracing::warn!(%error, "failed to produce to broker");
                        }
                        Err(_cancelled) => {
                            metrics::record_publish_failure();
                            tracing::warn!("producer dropped before delivery was acknowledged");
                        }
                    }
                });
            }
            Err((error, _record)) => {
                metrics::record_publish_failure();
                tracing::warn!(%error, "failed to enqueue record for production");
            }
        }
    }
}

// =============================================================================
// Source
// =============================================================================

/// Consumer-group record source over one broker topic.
pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Create a consumer client subscribed to the given topic.
    ///
    /// Auto-commit is disabled: progress is committed explicitly by the
    /// consume loop after each batch hand-off.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Construction`] if the client cannot be
    /// created or the subscription fails; fatal to consumer startup.
    pub fn new(brokers: &str, group: &str, topic: &str) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| BrokerError::Construction(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| BrokerError::Construction(e.to_string()))?;

        Ok(Self { consumer })
    }
}

#[async_trait::async_trait]
impl BrokerSource for KafkaSource {
    async fn poll(&self) -> PolledBatch {
        let mut batch = PolledBatch::default();

        match self.consumer.recv().await {
            Err(error) => {
                batch.errors.push(BrokerError::Transport(error.to_string()));
                return batch;
            }
            Ok(message) => batch.records.push(to_raw_record(&message)),
        }

        // First record in hand; drain whatever else is already available.
        while batch.records.len() < MAX_POLL_RECORDS {
            match tokio::time::timeout(POLL_DRAIN_WAIT, self.consumer.recv()).await {
                Ok(Ok(message)) => batch.records.push(to_raw_record(&message)),
                Ok(Err(error)) => {
                    batch.errors.push(BrokerError::Transport(error.to_string()));
                    break;
                }
                Err(_elapsed) => break,
            }
        }

        batch
    }

    async fn commit(&self, records: &[RawRecord]) -> Result<(), BrokerError> {
        let mut next_offsets: HashMap<(&str, i32), i64> = HashMap::new();
        for record in records {
            let next = next_offsets
                .entry((record.topic.as_str(), record.partition))
                .or_insert(0);
            *next = (*next).max(record.offset + 1);
        }

        let mut assignment = TopicPartitionList::new();
        for ((topic, partition), offset) in next_offsets {
            assignment
                .add_partition_offset(topic, partition, Offset::Offset(offset))
                .map_err(|e| BrokerError::Commit(e.to_string()))?;
        }

        self.consumer
            .commit(&assignment, rdkafka::consumer::CommitMode::Async)
            .map_err(|e| BrokerError::Commit(e.to_string()))
    }
}

fn to_raw_record(message: &rdkafka::message::BorrowedMessage<'_>) -> RawRecord {
    RawRecord {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn construction_against_unreachable_broker_succeeds() {
        // librdkafka connects lazily; client construction itself must not
        // depend on broker availability.
        let source = KafkaSource::new("localhost:19092", "test-group", "test-topic");
        assert!(source.is_ok());

        let publisher = KafkaPublisher::new("localhost:19092", "test-topic");
        assert!(publisher.is_ok());
    }
}

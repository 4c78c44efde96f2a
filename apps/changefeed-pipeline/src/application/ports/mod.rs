//! Port Interfaces
//!
//! Capability interfaces (ports) for external systems following the
//! Hexagonal Architecture pattern. Infrastructure adapters implement these;
//! tests substitute in-memory fakes without a broker or network.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`EventPublisher`]: fire-and-forget publication of encoded events
//! - [`BrokerSource`]: polling raw record batches and committing offsets
//! - [`StatsStore`]: persistence backend for the aggregate snapshot
//!
//! ## Driver Ports (Inbound)
//!
//! - [`StatsSink`]: non-blocking hand-off of decoded events to the aggregator

use async_trait::async_trait;

use crate::domain::event::ChangeEvent;
use crate::domain::stats::StatsSnapshot;

// =============================================================================
// Records
// =============================================================================

/// One raw record polled from the broker, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Topic the record was read from.
    pub topic: String,
    /// Partition the record was read from.
    pub partition: i32,
    /// Broker-assigned offset of the record within its partition.
    pub offset: i64,
    /// Opaque message payload.
    pub payload: Vec<u8>,
}

/// Result of one broker poll: zero or more records plus any transport
/// errors the broker client surfaced for this poll.
#[derive(Debug, Default)]
pub struct PolledBatch {
    /// Records fetched by this poll.
    pub records: Vec<RawRecord>,
    /// Transport-level errors reported by this poll.
    pub errors: Vec<BrokerError>,
}

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by broker adapters.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Failed to construct the broker client.
    #[error("failed to construct broker client: {0}")]
    Construction(String),

    /// Transport-level poll or delivery failure.
    #[error("broker transport error: {0}")]
    Transport(String),

    /// Offset commit failure.
    #[error("offset commit failed: {0}")]
    Commit(String),
}

/// Errors surfaced by persistence backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Could not establish a backend session after exhausting all attempts.
    #[error("failed to connect to storage after {attempts} attempts: {last_error}")]
    Connect {
        /// Number of connection attempts made.
        attempts: usize,
        /// The error returned by the final attempt.
        last_error: String,
    },

    /// A save or load query failed.
    #[error("storage query failed: {0}")]
    Query(String),
}

// =============================================================================
// Ports
// =============================================================================

/// Fire-and-forget publication of one encoded event.
///
/// `publish` must never block the caller: delivery acknowledgement is
/// observed asynchronously and only affects logging, never control flow.
pub trait EventPublisher: Send + Sync {
    /// Submit one encoded event for asynchronous, acknowledged publication.
    fn publish(&self, payload: Vec<u8>);
}

/// Polling side of the broker: fetch record batches, commit progress.
#[async_trait]
pub trait BrokerSource: Send + Sync {
    /// Poll the broker for the next batch of records.
    ///
    /// Blocks (asynchronously) until at least one record or error is
    /// available; the broker client's own blocking semantics provide
    /// backpressure, so callers retry empty polls without sleeping.
    async fn poll(&self) -> PolledBatch;

    /// Commit consumption progress for the given records.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Commit`] if the commit could not be issued;
    /// callers log and continue, relying on at-least-once redelivery.
    async fn commit(&self, records: &[RawRecord]) -> Result<(), BrokerError>;
}

/// Non-blocking hand-off of decoded events toward the aggregate.
pub trait StatsSink: Send + Sync {
    /// Enqueue one event for aggregation. Never blocks; on overflow the
    /// event is dropped and a warning is recorded.
    fn enqueue(&self, event: ChangeEvent);
}

/// Persistence backend holding the latest aggregate snapshot.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Persist one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the snapshot could not be written.
    async fn save(&self, snapshot: &StatsSnapshot) -> Result<(), StorageError>;

    /// Load the most recently available snapshot.
    ///
    /// Backends with nothing stored return an empty snapshot rather than
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend could not be read.
    async fn load(&self) -> Result<StatsSnapshot, StorageError>;
}

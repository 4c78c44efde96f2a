#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Changefeed Pipeline - Change-Event Stream Aggregator
//!
//! Ingests a continuous public change-event feed (server-sent events over
//! HTTP), republishes each event onto a durable broker topic, and maintains
//! running aggregate statistics over the republished events with batched,
//! crash-tolerant persistence.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core event and statistics types
//!   - `event`: The change event value type
//!   - `stats`: The aggregate snapshot and its read projection
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Capability interfaces for the broker, publisher, and storage
//!   - `aggregator`: Bounded-queue statistics aggregator with a batch worker
//!   - `consume`: The broker poll/decode/enqueue/commit loop
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: SSE feed reader feeding the publisher
//!   - `wire`: Binary wire codec for broker messages
//!   - `kafka`: rdkafka publisher and consumer adapters
//!   - `storage`: In-memory and Scylla persistence backends
//!   - `http`: Stats read-projection HTTP endpoint
//!   - `config`, `metrics`, `telemetry`: Service plumbing
//!
//! # Data Flow
//!
//! ```text
//! SSE feed ──► FeedReader ──► wire::encode ──► KafkaPublisher ──► topic
//!
//! topic ──► KafkaSource ──► wire::decode ──► StatsAggregator ──► StatsStore
//!                 │                               ▲
//!                 └── commit after handoff        └── GET /stats projection
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core event and statistics types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::event::ChangeEvent;
pub use domain::stats::{StatsResponse, StatsSnapshot};

// Application ports and services
pub use application::aggregator::StatsAggregator;
pub use application::consume::run_consume_loop;
pub use application::ports::{
    BrokerError, BrokerSource, EventPublisher, PolledBatch, RawRecord, StatsSink, StatsStore,
    StorageError,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, KafkaSettings, PipelineConfig, StorageSettings};

// Wire codec
pub use infrastructure::wire::{self, WireError};

// Feed reader
pub use infrastructure::feed::{FeedError, stream_and_publish};

// Broker adapters
pub use infrastructure::kafka::{KafkaPublisher, KafkaSource};

// Persistence backends
pub use infrastructure::storage::{MemoryStore, ScyllaStore};

// Stats HTTP server
pub use infrastructure::http::{StatsServer, StatsServerError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;

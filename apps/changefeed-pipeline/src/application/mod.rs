//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the pipeline's control loops and the port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for the broker, publisher, stats sink, and storage.
pub mod ports;

/// Bounded-queue statistics aggregator with a single batch worker.
pub mod aggregator;

/// Broker poll/decode/enqueue/commit loop.
pub mod consume;

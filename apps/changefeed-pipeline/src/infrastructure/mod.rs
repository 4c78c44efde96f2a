//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// SSE feed reader feeding the publisher.
pub mod feed;

/// Binary wire codec for broker messages.
pub mod wire;

/// rdkafka publisher and consumer adapters.
pub mod kafka;

/// In-memory and Scylla persistence backends.
pub mod storage;

/// Configuration loading.
pub mod config;

/// Stats read-projection HTTP endpoint.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing/logging initialization.
pub mod telemetry;

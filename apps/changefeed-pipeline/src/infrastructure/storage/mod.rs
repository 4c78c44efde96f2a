//! Persistence Backends
//!
//! Implementations of the [`StatsStore`](crate::application::ports::StatsStore)
//! port:
//!
//! - [`MemoryStore`]: volatile in-process store holding the latest snapshot.
//! - [`ScyllaStore`]: distributed wide-column store, append-only: one row
//!   per save, unordered single-row read.

mod memory;
mod scylla;

pub use memory::MemoryStore;
pub use scylla::ScyllaStore;

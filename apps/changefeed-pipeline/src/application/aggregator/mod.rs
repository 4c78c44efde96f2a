//! Statistics Aggregator
//!
//! Owns the aggregate snapshot and serializes all mutation through a single
//! batch-worker task, regardless of how many producer loops enqueue events
//! concurrently.
//!
//! # Design
//!
//! - `enqueue` is a non-blocking `try_send` onto a bounded queue; on
//!   overflow the event is dropped with a warning. Producers are never
//!   blocked and never see an error.
//! - One batch worker drains the queue into a local buffer and flushes it
//!   when the buffer reaches [`BATCH_SIZE`] events or [`FLUSH_PERIOD`]
//!   elapses, whichever comes first. A flush applies the buffered events to
//!   the snapshot under the lock and then persists the snapshot through the
//!   [`StatsStore`] port.
//! - Persistence failures are logged and never roll back the in-memory
//!   mutation; mutation and persistence are not transactional with each
//!   other.
//! - The snapshot lock is held only to apply a batch or compute a
//!   projection, never across a storage call.
//!
//! When every aggregator handle has been dropped the worker flushes whatever
//! remains in its buffer, persists once more, and exits.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::ports::{StatsSink, StatsStore, StorageError};
use crate::domain::event::ChangeEvent;
use crate::domain::stats::{StatsResponse, StatsSnapshot};
use crate::infrastructure::metrics;

/// Capacity of the bounded update queue between enqueuers and the worker.
pub const UPDATE_QUEUE_CAPACITY: usize = 1000;

/// Buffered events that trigger a flush regardless of elapsed time.
const BATCH_SIZE: usize = 100;

/// Maximum time between flushes while events are buffered.
const FLUSH_PERIOD: Duration = Duration::from_secs(1);

// =============================================================================
// Aggregator Handle
// =============================================================================

/// Clonable handle to one aggregator instance.
///
/// Construction spawns the batch-worker task; all clones share the same
/// snapshot, queue, and worker. Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct StatsAggregator {
    shared: Arc<Shared>,
    update_tx: mpsc::Sender<ChangeEvent>,
}

struct Shared {
    snapshot: Mutex<StatsSnapshot>,
    store: Arc<dyn StatsStore>,
}

impl Shared {
    /// Clone the snapshot under the lock, then hand it to the backend.
    async fn persist(&self) -> Result<(), StorageError> {
        let snapshot = self.snapshot.lock().clone();
        match self.store.save(&snapshot).await {
            Ok(()) => {
                metrics::record_snapshot_saved();
                Ok(())
            }
            Err(error) => {
                metrics::record_snapshot_save_failure();
                Err(error)
            }
        }
    }
}

impl StatsAggregator {
    /// Create a new aggregator backed by the given store and start its
    /// batch worker.
    #[must_use]
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        let (update_tx, update_rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
        let shared = Arc::new(Shared {
            snapshot: Mutex::new(StatsSnapshot::default()),
            store,
        });

        tokio::spawn(batch_worker(Arc::clone(&shared), update_rx));

        Self { shared, update_tx }
    }

    /// Enqueue one event for aggregation.
    ///
    /// Non-blocking: if the queue is full the event is dropped and a warning
    /// is recorded. The caller never receives an error.
    pub fn enqueue(&self, event: ChangeEvent) {
        if self.update_tx.try_send(event).is_err() {
            metrics::record_update_dropped();
            tracing::warn!("stats update queue full, dropping update");
        }
    }

    /// Compute the read projection of the current snapshot.
    ///
    /// Safe to call concurrently with mutation; the shared lock guarantees a
    /// consistent point-in-time view.
    #[must_use]
    pub fn snapshot(&self) -> StatsResponse {
        self.shared.snapshot.lock().to_response()
    }

    /// Persist the current snapshot through the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend rejected the save. The
    /// in-memory snapshot is unaffected either way.
    pub async fn save(&self) -> Result<(), StorageError> {
        self.shared.persist().await
    }

    /// Replace the current snapshot wholesale with the backend's copy.
    ///
    /// A backend with nothing stored yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend could not be read; the
    /// current snapshot is left untouched in that case.
    pub async fn load(&self) -> Result<(), StorageError> {
        let loaded = self.shared.store.load().await?;
        *self.shared.snapshot.lock() = loaded;
        Ok(())
    }

    /// Spawn an independent task that saves the snapshot on a fixed cadence,
    /// for defense-in-depth against a backend outage at flush time.
    ///
    /// Failures are logged and never fatal; the next tick simply tries
    /// again.
    pub fn start_periodic_save(&self, interval: Duration) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval yields immediately on its first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = shared.persist().await {
                    tracing::error!(%error, "periodic stats save failed");
                }
            }
        })
    }
}

impl StatsSink for StatsAggregator {
    fn enqueue(&self, event: ChangeEvent) {
        Self::enqueue(self, event);
    }
}

// =============================================================================
// Batch Worker
// =============================================================================

/// Single owner of all snapshot mutation for one aggregator instance.
async fn batch_worker(shared: Arc<Shared>, mut update_rx: mpsc::Receiver<ChangeEvent>) {
    let mut ticker = tokio::time::interval(FLUSH_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut batch: Vec<ChangeEvent> = Vec::with_capacity(BATCH_SIZE);

    loop {
        tokio::select! {
            maybe_event = update_rx.recv() => match maybe_event {
                Some(event) => {
                    batch.push(event);
                    if batch.len() >= BATCH_SIZE {
                        flush(&shared, &mut batch).await;
                    }
                }
                None => {
                    // every handle dropped: drain and stop
                    flush(&shared, &mut batch).await;
                    tracing::debug!("stats batch worker stopped");
                    return;
                }
            },
            _ = ticker.tick() => {
                flush(&shared, &mut batch).await;
            }
        }
    }
}

/// Apply the buffered events under the lock, then persist once.
async fn flush(shared: &Shared, batch: &mut Vec<ChangeEvent>) {
    if batch.is_empty() {
        return;
    }

    {
        let mut snapshot = shared.snapshot.lock();
        snapshot.apply_batch(batch);
    }
    batch.clear();

    if let Err(error) = shared.persist().await {
        tracing::error!(%error, "failed to save stats after batch update");
    }
}

// =============================================================================
// Tests
// =============================================================================

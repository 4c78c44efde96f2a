//! In-Memory Persistence Backend
//!
//! Holds the single latest snapshot behind a lock. No identity, no history;
//! loading from a never-saved store yields an empty snapshot.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{StatsStore, StorageError};
use crate::domain::stats::StatsSnapshot;

/// Volatile in-process store for the aggregate snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stats: Mutex<StatsSnapshot>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn save(&self, snapshot: &StatsSnapshot) -> Result<(), StorageError> {
        *self.stats.lock() = snapshot.clone();
        Ok(())
    }

    async fn load(&self) -> Result<StatsSnapshot, StorageError> {
        Ok(self.stats.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::ChangeEvent;

    #[tokio::test]
    async fn load_before_save_is_empty() {
        let store = MemoryStore::new();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, StatsSnapshot::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = MemoryStore::new();

        let mut snapshot = StatsSnapshot::default();
        snapshot.record(&ChangeEvent {
            user: "alice".to_string(),
            bot: false,
            server_url: "https://one.org".to_string(),
        });
        snapshot.record(&ChangeEvent {
            user: "bot".to_string(),
            bot: true,
            server_url: "https://two.org".to_string(),
        });

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn later_save_replaces_earlier() {
        let store = MemoryStore::new();

        let first = StatsSnapshot {
            messages_consumed: 1,
            non_bots_count: 1,
            ..Default::default()
        };
        let second = StatsSnapshot {
            messages_consumed: 5,
            non_bots_count: 5,
            ..Default::default()
        };

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        assert_eq!(store.load().await.unwrap().messages_consumed, 5);
    }
}

//! Aggregate Statistics
//!
//! The mutable aggregate snapshot maintained over consumed events, and the
//! read-only projection served to HTTP clients.
//!
//! Every field of the snapshot is monotonically non-decreasing for the
//! lifetime of a snapshot instance. Cardinality queries (distinct users,
//! distinct origins) are the sizes of the two occurrence maps, not stored
//! counters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::event::ChangeEvent;

// =============================================================================
// Snapshot
// =============================================================================

/// Running aggregate statistics over consumed change events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Total number of events applied to this snapshot.
    pub messages_consumed: u64,
    /// Occurrence count per user name.
    pub distinct_users: HashMap<String, u64>,
    /// Number of events flagged as bot changes.
    pub bots_count: u64,
    /// Number of events not flagged as bot changes.
    pub non_bots_count: u64,
    /// Occurrence count per origin server URL.
    pub distinct_server_urls: HashMap<String, u64>,
}

impl StatsSnapshot {
    /// Apply a single event to the snapshot.
    pub fn record(&mut self, event: &ChangeEvent) {
        self.messages_consumed += 1;
        *self.distinct_users.entry(event.user.clone()).or_insert(0) += 1;
        *self
            .distinct_server_urls
            .entry(event.server_url.clone())
            .or_insert(0) += 1;

        if event.bot {
            self.bots_count += 1;
        } else {
            self.non_bots_count += 1;
        }
    }

    /// Apply a batch of events in order.
    pub fn apply_batch(&mut self, batch: &[ChangeEvent]) {
        for event in batch {
            self.record(event);
        }
    }

    /// Number of distinct users seen.
    #[must_use]
    pub fn distinct_user_count(&self) -> usize {
        self.distinct_users.len()
    }

    /// Number of distinct origin server URLs seen.
    #[must_use]
    pub fn distinct_server_url_count(&self) -> usize {
        self.distinct_server_urls.len()
    }

    /// Compute the read-only projection of this snapshot.
    #[must_use]
    pub fn to_response(&self) -> StatsResponse {
        StatsResponse {
            messages_consumed: self.messages_consumed,
            distinct_users: self.distinct_users.len() as u64,
            bots_count: self.bots_count,
            non_bots_count: self.non_bots_count,
            distinct_server_urls: self.distinct_server_urls.len() as u64,
        }
    }
}

// =============================================================================
// Read Projection
// =============================================================================

/// Read-only projection of a [`StatsSnapshot`].
///
/// Serialized as the JSON body of `GET /stats`; the two map-valued snapshot
/// fields are projected down to their cardinalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Total number of events applied.
    pub messages_consumed: u64,
    /// Number of distinct users.
    pub distinct_users: u64,
    /// Number of bot events.
    pub bots_count: u64,
    /// Number of non-bot events.
    pub non_bots_count: u64,
    /// Number of distinct origin server URLs.
    pub distinct_server_urls: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(user: &str, bot: bool, server_url: &str) -> ChangeEvent {
        ChangeEvent {
            user: user.to_string(),
            bot,
            server_url: server_url.to_string(),
        }
    }

    #[test]
    fn record_single_event() {
        let mut snapshot = StatsSnapshot::default();
        snapshot.record(&event("blub_user", false, "https://blub.com"));

        assert_eq!(snapshot.messages_consumed, 1);
        assert_eq!(snapshot.distinct_users["blub_user"], 1);
        assert_eq!(snapshot.bots_count, 0);
        assert_eq!(snapshot.non_bots_count, 1);
        assert_eq!(snapshot.distinct_server_urls["https://blub.com"], 1);
    }

    #[test]
    fn bot_and_non_bot_counts_partition_total() {
        let mut snapshot = StatsSnapshot::default();
        snapshot.apply_batch(&[
            event("a", true, "https://x.org"),
            event("b", false, "https://x.org"),
            event("c", true, "https://y.org"),
        ]);

        assert_eq!(snapshot.messages_consumed, 3);
        assert_eq!(snapshot.bots_count + snapshot.non_bots_count, 3);
        assert_eq!(snapshot.bots_count, 2);
        assert_eq!(snapshot.non_bots_count, 1);
    }

    #[test]
    fn distinct_counts_ignore_repeats() {
        let mut snapshot = StatsSnapshot::default();
        snapshot.apply_batch(&[
            event("alice", false, "https://one.org"),
            event("alice", false, "https://one.org"),
            event("alice", false, "https://two.org"),
            event("bob", false, "https://one.org"),
        ]);

        assert_eq!(snapshot.distinct_user_count(), 2);
        assert_eq!(snapshot.distinct_server_url_count(), 2);
        assert_eq!(snapshot.distinct_users["alice"], 3);
        assert_eq!(snapshot.distinct_users["bob"], 1);
    }

    #[test]
    fn response_projects_cardinalities() {
        let mut snapshot = StatsSnapshot {
            messages_consumed: 10,
            bots_count: 4,
            non_bots_count: 6,
            ..Default::default()
        };
        snapshot.distinct_users.insert("user1".to_string(), 1);
        snapshot.distinct_users.insert("user2".to_string(), 2);
        snapshot
            .distinct_server_urls
            .insert("https://blub.com".to_string(), 3);

        let response = snapshot.to_response();
        assert_eq!(
            response,
            StatsResponse {
                messages_consumed: 10,
                distinct_users: 2,
                bots_count: 4,
                non_bots_count: 6,
                distinct_server_urls: 1,
            }
        );
    }

    #[test]
    fn response_serializes_with_wire_names() {
        let response = StatsResponse {
            messages_consumed: 1,
            distinct_users: 1,
            bots_count: 0,
            non_bots_count: 1,
            distinct_server_urls: 1,
        };

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messages_consumed": 1,
                "distinct_users": 1,
                "bots_count": 0,
                "non_bots_count": 1,
                "distinct_server_urls": 1,
            })
        );
    }
}

//! Scylla Persistence Backend
//!
//! Wide-column store for aggregate snapshots. The table is append-only:
//! every save INSERTs a fresh row keyed by a newly generated time-ordered
//! UUID, and load reads one arbitrary row (`LIMIT 1`, no ordering clause).
//! This mirrors the externally observed contract of the source system; see
//! DESIGN.md for the retention discussion.
//!
//! Expected schema:
//!
//! ```cql
//! CREATE TABLE stats (
//!     id uuid PRIMARY KEY,
//!     messages_consumed bigint,
//!     distinct_users map<text, bigint>,
//!     bots_count bigint,
//!     non_bots_count bigint,
//!     distinct_server_urls map<text, bigint>
//! );
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use scylla::{Session, SessionBuilder};
use uuid::Uuid;

use crate::application::ports::{StatsStore, StorageError};
use crate::domain::stats::StatsSnapshot;

/// Connection attempts before construction fails.
const CONNECT_ATTEMPTS: usize = 10;

/// Fixed delay between connection attempts.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(3);

const INSERT_STATS: &str = "INSERT INTO stats \
    (id, messages_consumed, distinct_users, bots_count, non_bots_count, distinct_server_urls) \
    VALUES (?, ?, ?, ?, ?, ?)";

const SELECT_STATS: &str = "SELECT \
    messages_consumed, distinct_users, bots_count, non_bots_count, distinct_server_urls \
    FROM stats LIMIT 1";

/// Row shape returned by [`SELECT_STATS`]; map columns are NULL when empty.
type StatsRow = (
    i64,
    Option<HashMap<String, i64>>,
    i64,
    i64,
    Option<HashMap<String, i64>>,
);

/// Scylla-backed snapshot store.
pub struct ScyllaStore {
    session: Session,
}

impl ScyllaStore {
    /// Open a session against the cluster, retrying with a fixed delay.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connect`] only after exhausting all
    /// attempts; fatal to consumer startup.
    pub async fn connect(hosts: &[String], keyspace: &str) -> Result<Self, StorageError> {
        let mut last_error = String::new();

        for attempt in 1..=CONNECT_ATTEMPTS {
            match SessionBuilder::new()
                .known_nodes(hosts)
                .use_keyspace(keyspace, false)
                .build()
                .await
            {
                Ok(session) => return Ok(Self { session }),
                Err(error) => {
                    tracing::warn!(attempt, %error, "failed to connect to scylla, retrying");
                    last_error = error.to_string();
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }

        tracing::error!(%last_error, "failed to connect to scylla after retries");
        Err(StorageError::Connect {
            attempts: CONNECT_ATTEMPTS,
            last_error,
        })
    }
}

#[async_trait]
impl StatsStore for ScyllaStore {
    async fn save(&self, snapshot: &StatsSnapshot) -> Result<(), StorageError> {
        let id = Uuid::now_v7();

        self.session
            .query(
                INSERT_STATS,
                (
                    id,
                    to_db_count(snapshot.messages_consumed),
                    to_db_map(&snapshot.distinct_users),
                    to_db_count(snapshot.bots_count),
                    to_db_count(snapshot.non_bots_count),
                    to_db_map(&snapshot.distinct_server_urls),
                ),
            )
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        tracing::debug!(%id, "stats saved to scylla");
        Ok(())
    }

    async fn load(&self) -> Result<StatsSnapshot, StorageError> {
        let result = self
            .session
            .query(SELECT_STATS, ())
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let row = result
            .maybe_first_row_typed::<StatsRow>()
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let Some((messages_consumed, distinct_users, bots_count, non_bots_count, server_urls)) =
            row
        else {
            // Nothing saved yet: start from an empty snapshot.
            return Ok(StatsSnapshot::default());
        };

        Ok(StatsSnapshot {
            messages_consumed: from_db_count(messages_consumed),
            distinct_users: from_db_map(distinct_users),
            bots_count: from_db_count(bots_count),
            non_bots_count: from_db_count(non_bots_count),
            distinct_server_urls: from_db_map(server_urls),
        })
    }
}

// =============================================================================
// Column Conversions
// =============================================================================

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_db_map(map: &HashMap<String, u64>) -> HashMap<String, i64> {
    map.iter()
        .map(|(key, value)| (key.clone(), to_db_count(*value)))
        .collect()
}

/// NULL map columns read back as absent and become empty maps.
fn from_db_map(map: Option<HashMap<String, i64>>) -> HashMap<String, u64> {
    map.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, from_db_count(value)))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

//! Pipeline Flow Integration Tests
//!
//! Drives the two sides of the pipeline in-process with fakes standing in
//! for the broker: feed lines are read and published, the published wire
//! payloads are replayed as polled records, and the aggregate snapshot is
//! checked end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use changefeed_pipeline::infrastructure::feed::process_lines;
use changefeed_pipeline::{
    BrokerError, BrokerSource, ChangeEvent, EventPublisher, MemoryStore, PolledBatch, RawRecord,
    StatsAggregator, StatsSink, StatsStore, run_consume_loop, wire,
};

// =============================================================================
// Fakes
// =============================================================================

/// Publisher that records encoded payloads, standing in for the topic.
#[derive(Default)]
struct TopicBuffer {
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl EventPublisher for TopicBuffer {
    fn publish(&self, payload: Vec<u8>) {
        self.payloads.lock().push(payload);
    }
}

/// Source that serves scripted polls, then parks until cancellation.
struct ScriptedSource {
    polls: Mutex<Vec<PolledBatch>>,
    commits: Mutex<usize>,
    cancel: CancellationToken,
}

impl ScriptedSource {
    fn new(polls: Vec<PolledBatch>, cancel: CancellationToken) -> Self {
        Self {
            polls: Mutex::new(polls),
            commits: Mutex::new(0),
            cancel,
        }
    }

    fn from_payloads(payloads: Vec<Vec<u8>>, cancel: CancellationToken) -> Self {
        let records = payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| RawRecord {
                topic: "wikimedia-changes".to_string(),
                partition: 0,
                offset: i as i64,
                payload,
            })
            .collect();

        Self::new(
            vec![PolledBatch {
                records,
                errors: vec![],
            }],
            cancel,
        )
    }
}

#[async_trait]
impl BrokerSource for ScriptedSource {
    async fn poll(&self) -> PolledBatch {
        let next = self.polls.lock().pop();
        match next {
            Some(batch) => batch,
            None => {
                self.cancel.cancel();
                std::future::pending().await
            }
        }
    }

    async fn commit(&self, _records: &[RawRecord]) -> Result<(), BrokerError> {
        *self.commits.lock() += 1;
        Ok(())
    }
}

fn encoded(user: &str, bot: bool, server_url: &str) -> Vec<u8> {
    wire::encode(&ChangeEvent {
        user: user.to_string(),
        bot,
        server_url: server_url.to_string(),
    })
}

// =============================================================================
// End-to-End Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn feed_line_to_snapshot() {
    // Producer side: one well-formed feed line.
    let body = "data: {\"user\":\"blub_user\",\"bot\":false,\"server_url\":\"https://blub.com\"}\n";
    let topic = TopicBuffer::default();
    let feed_cancel = CancellationToken::new();

    process_lines(Cursor::new(body), &topic, &feed_cancel)
        .await
        .unwrap();

    let payloads = topic.payloads.lock().clone();
    assert_eq!(payloads.len(), 1);

    // Consumer side: replay the published payloads as one polled batch.
    let cancel = CancellationToken::new();
    let source = Arc::new(ScriptedSource::from_payloads(payloads, cancel.clone()));
    let aggregator = StatsAggregator::new(Arc::new(MemoryStore::new()) as Arc<dyn StatsStore>);
    let sink = Arc::new(aggregator.clone()) as Arc<dyn StatsSink>;

    run_consume_loop(Arc::clone(&source) as _, sink, cancel).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let response = aggregator.snapshot();
    assert_eq!(response.messages_consumed, 1);
    assert_eq!(response.distinct_users, 1);
    assert_eq!(response.bots_count, 0);
    assert_eq!(response.non_bots_count, 1);
    assert_eq!(response.distinct_server_urls, 1);

    assert_eq!(*source.commits.lock(), 1);
}

#[tokio::test(start_paused = true)]
async fn error_poll_then_batch_commits_once() {
    let cancel = CancellationToken::new();
    // Polls are served back-to-front: first the transport error, then the
    // three-record batch.
    let polls = vec![
        PolledBatch {
            records: vec![
                RawRecord {
                    topic: "wikimedia-changes".to_string(),
                    partition: 0,
                    offset: 0,
                    payload: encoded("a", false, "https://x.org"),
                },
                RawRecord {
                    topic: "wikimedia-changes".to_string(),
                    partition: 0,
                    offset: 1,
                    payload: encoded("b", true, "https://x.org"),
                },
                RawRecord {
                    topic: "wikimedia-changes".to_string(),
                    partition: 0,
                    offset: 2,
                    payload: encoded("c", false, "https://y.org"),
                },
            ],
            errors: vec![],
        },
        PolledBatch {
            records: vec![],
            errors: vec![BrokerError::Transport("connection reset".to_string())],
        },
    ];
    let source = Arc::new(ScriptedSource::new(polls, cancel.clone()));
    let aggregator = StatsAggregator::new(Arc::new(MemoryStore::new()) as Arc<dyn StatsStore>);
    let sink = Arc::new(aggregator.clone()) as Arc<dyn StatsSink>;

    run_consume_loop(Arc::clone(&source) as _, sink, cancel).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(aggregator.snapshot().messages_consumed, 3);
    // Only the successful poll commits; the error poll never does.
    assert_eq!(*source.commits.lock(), 1);
}

#[tokio::test(start_paused = true)]
async fn counts_add_up_over_many_events() {
    const TOTAL: usize = 250;

    let cancel = CancellationToken::new();
    let payloads = (0..TOTAL)
        .map(|i| {
            encoded(
                &format!("user-{}", i % 7),
                i % 3 == 0,
                &format!("https://wiki-{}.org", i % 5),
            )
        })
        .collect();
    let source = Arc::new(ScriptedSource::from_payloads(payloads, cancel.clone()));
    let aggregator = StatsAggregator::new(Arc::new(MemoryStore::new()) as Arc<dyn StatsStore>);
    let sink = Arc::new(aggregator.clone()) as Arc<dyn StatsSink>;

    run_consume_loop(Arc::clone(&source) as _, sink, cancel).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let response = aggregator.snapshot();
    assert_eq!(response.messages_consumed, TOTAL as u64);
    assert_eq!(response.bots_count + response.non_bots_count, TOTAL as u64);
    assert_eq!(response.distinct_users, 7);
    assert_eq!(response.distinct_server_urls, 5);
}

#[tokio::test(start_paused = true)]
async fn two_consume_loops_share_one_aggregator() {
    // Each loop is an independent control loop with its own cancellation;
    // they share only the downstream aggregator.
    let first_cancel = CancellationToken::new();
    let second_cancel = CancellationToken::new();

    let first = Arc::new(ScriptedSource::from_payloads(
        vec![
            encoded("alice", false, "https://one.org"),
            encoded("bob", false, "https://one.org"),
        ],
        first_cancel.clone(),
    ));
    let second = Arc::new(ScriptedSource::from_payloads(
        vec![encoded("alice", true, "https://two.org")],
        second_cancel.clone(),
    ));

    let aggregator = StatsAggregator::new(Arc::new(MemoryStore::new()) as Arc<dyn StatsStore>);

    let first_loop = tokio::spawn(run_consume_loop(
        Arc::clone(&first) as _,
        Arc::new(aggregator.clone()) as _,
        first_cancel,
    ));
    let second_loop = tokio::spawn(run_consume_loop(
        Arc::clone(&second) as _,
        Arc::new(aggregator.clone()) as _,
        second_cancel,
    ));

    first_loop.await.unwrap();
    second_loop.await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let response = aggregator.snapshot();
    assert_eq!(response.messages_consumed, 3);
    assert_eq!(response.distinct_users, 2);
    assert_eq!(response.bots_count, 1);
    assert_eq!(response.non_bots_count, 2);
    assert_eq!(response.distinct_server_urls, 2);
}

#[tokio::test(start_paused = true)]
async fn snapshot_survives_save_and_load() {
    let store = Arc::new(MemoryStore::new());

    // First aggregator lifetime: consume, flush, save.
    {
        let aggregator = StatsAggregator::new(Arc::clone(&store) as Arc<dyn StatsStore>);
        aggregator.enqueue(ChangeEvent {
            user: "alice".to_string(),
            bot: false,
            server_url: "https://one.org".to_string(),
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        aggregator.save().await.unwrap();
    }

    // Second lifetime: load replaces the empty snapshot wholesale.
    let restarted = StatsAggregator::new(Arc::clone(&store) as Arc<dyn StatsStore>);
    assert_eq!(restarted.snapshot().messages_consumed, 0);

    restarted.load().await.unwrap();
    let response = restarted.snapshot();
    assert_eq!(response.messages_consumed, 1);
    assert_eq!(response.distinct_users, 1);
}

//! Changefeed Consumer Binary
//!
//! Polls the broker topic, maintains aggregate statistics with batched
//! persistence, and serves the read projection over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin changefeed-consumer
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `STREAM_URL`: Change-event feed URL (shared config with the producer)
//!
//! ## Optional
//! - `KAFKA_BROKERS`: Bootstrap broker list (default: localhost:9092)
//! - `KAFKA_TOPIC`: Topic to consume (default: wikimedia-changes)
//! - `KAFKA_GROUP`: Consumer group (default: wikimedia-consumer-group)
//! - `USE_SCYLLA`: Persist to Scylla instead of memory (default: false)
//! - `SCYLLA_HOSTS`: Scylla contact points (default: scylla:9042)
//! - `SCYLLA_KEYSPACE`: Keyspace holding the stats table (default: stats_data)
//! - `HTTP_PORT`: Stats/health/metrics port (default: 7000)
//! - `SAVE_INTERVAL_SECS`: Periodic save cadence (default: 60)
//! - `CONSUMER_INSTANCES`: Concurrent consume loops (default: 1)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use changefeed_pipeline::{
    KafkaSource, MemoryStore, PipelineConfig, ScyllaStore, StatsAggregator, StatsServer,
    StatsSink, StatsStore, run_consume_loop,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    changefeed_pipeline::init_telemetry();
    let _metrics_handle = changefeed_pipeline::init_metrics();

    tracing::info!("starting changefeed consumer");

    let config = PipelineConfig::from_env()?;
    tracing::info!(
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        group = %config.kafka.group,
        use_scylla = config.storage.use_scylla,
        http_port = config.server.http_port,
        "configuration loaded"
    );

    let store = init_storage(&config).await?;
    let aggregator = StatsAggregator::new(store);

    if let Err(error) = aggregator.load().await {
        tracing::warn!(%error, "failed to load persisted stats, starting empty");
    }
    aggregator.start_periodic_save(config.save_interval);

    let shutdown_token = CancellationToken::new();
    spawn_shutdown_handler(shutdown_token.clone());

    let stats_server = StatsServer::new(
        config.server.http_port,
        aggregator.clone(),
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(error) = stats_server.run().await {
            tracing::error!(%error, "stats server error");
        }
    });

    tracing::info!("consumer started, waiting for messages");

    let mut loop_handles = Vec::with_capacity(config.consumer_instances);
    for instance in 0..config.consumer_instances {
        let source = Arc::new(KafkaSource::new(
            &config.kafka.brokers,
            &config.kafka.group,
            &config.kafka.topic,
        )?);
        let sink = Arc::new(aggregator.clone()) as Arc<dyn StatsSink>;

        tracing::info!(instance, "consume loop started");
        loop_handles.push(tokio::spawn(run_consume_loop(
            source,
            sink,
            shutdown_token.clone(),
        )));
    }

    for handle in loop_handles {
        let _ = handle.await;
    }

    // One last save so a clean shutdown keeps everything applied so far.
    if let Err(error) = aggregator.save().await {
        tracing::warn!(%error, "final stats save failed");
    }

    tracing::info!("consumer exited cleanly");
    Ok(())
}

/// Pick the persistence backend from configuration.
///
/// Scylla construction retries internally and is fatal after exhausting its
/// attempts.
async fn init_storage(config: &PipelineConfig) -> anyhow::Result<Arc<dyn StatsStore>> {
    if config.storage.use_scylla {
        let store = ScyllaStore::connect(
            &config.storage.scylla_hosts,
            &config.storage.scylla_keyspace,
        )
        .await?;
        return Ok(Arc::new(store));
    }

    tracing::info!("using in-memory storage");
    Ok(Arc::new(MemoryStore::new()))
}

/// Cancel the token on SIGINT or SIGTERM.
#[allow(clippy::expect_used)]
fn spawn_shutdown_handler(shutdown_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("signal handler installation is critical for graceful shutdown");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("SIGTERM handler installation is critical for graceful shutdown")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("received Ctrl+C, shutting down consumer"),
            () = terminate => tracing::info!("received SIGTERM, shutting down consumer"),
        }

        shutdown_token.cancel();
    });
}

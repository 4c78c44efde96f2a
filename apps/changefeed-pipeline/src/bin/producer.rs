//! Changefeed Producer Binary
//!
//! Reads the change-event SSE feed and republishes every event onto the
//! broker topic.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin changefeed-producer
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `STREAM_URL`: Change-event feed URL
//!
//! ## Optional
//! - `KAFKA_BROKERS`: Bootstrap broker list (default: localhost:9092)
//! - `KAFKA_TOPIC`: Topic to publish to (default: wikimedia-changes)
//! - `RUST_LOG`: Log level (default: info)

use changefeed_pipeline::{FeedError, KafkaPublisher, PipelineConfig, stream_and_publish};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    changefeed_pipeline::init_telemetry();
    tracing::info!("starting changefeed producer");

    let config = PipelineConfig::from_env()?;
    tracing::info!(
        stream_url = %config.stream_url,
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        "configuration loaded"
    );

    let publisher = KafkaPublisher::new(&config.kafka.brokers, config.kafka.topic.clone())?;

    let shutdown_token = CancellationToken::new();
    spawn_shutdown_handler(shutdown_token.clone());

    match stream_and_publish(&config.stream_url, &publisher, &shutdown_token).await {
        Ok(()) => tracing::info!("feed ended, producer exiting"),
        Err(FeedError::Cancelled) => tracing::info!("producer exited cleanly"),
        Err(error) => {
            tracing::error!(%error, "producer error");
            return Err(error.into());
        }
    }

    Ok(())
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
            () = ctrl_c => tracing::info!("received Ctrl+C, shutting down producer"),
            () = terminate => tracing::info!("received SIGTERM, shutting down producer"),
        }

        shutdown_token.cancel();
    });
}

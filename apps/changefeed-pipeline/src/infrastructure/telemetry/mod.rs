//! Tracing Initialization
//!
//! Configures structured logging for the pipeline binaries: a fmt layer
//! with an `EnvFilter`, honoring `RUST_LOG` with sensible defaults for the
//! crate and its noisier dependencies.
//!
//! # Usage
//!
//! ```ignore
//! changefeed_pipeline::init_telemetry();
//! tracing::info!("starting");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Call once at binary startup, before any other task is spawned.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "changefeed_pipeline=info"
                .parse()
                .expect("static directive 'changefeed_pipeline=info' is valid"),
        )
        .add_directive(
            "librdkafka=warn"
                .parse()
                .expect("static directive 'librdkafka=warn' is valid"),
        )
        .add_directive(
            "hyper=warn"
                .parse()
                .expect("static directive 'hyper=warn' is valid"),
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

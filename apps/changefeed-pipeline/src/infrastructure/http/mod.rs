//! Stats HTTP Endpoint
//!
//! Small axum server on the consumer binary exposing the aggregate read
//! projection and operational endpoints.
//!
//! # Endpoints
//!
//! - `GET /stats` - Current aggregate statistics as JSON
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::aggregator::StatsAggregator;
use crate::infrastructure::metrics::get_metrics_handle;

/// Stats read-projection HTTP server.
pub struct StatsServer {
    port: u16,
    aggregator: StatsAggregator,
    cancel: CancellationToken,
}

impl StatsServer {
    /// Create a new stats server.
    #[must_use]
    pub const fn new(port: u16, aggregator: StatsAggregator, cancel: CancellationToken) -> Self {
        Self {
            port,
            aggregator,
            cancel,
        }
    }

    /// Build the router; split out for in-process testing.
    #[must_use]
    pub fn router(aggregator: StatsAggregator) -> Router {
        Router::new()
            .route("/stats", get(stats_handler))
            .route("/healthz", get(liveness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(aggregator)
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`StatsServerError`] if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), StatsServerError> {
        let app = Self::router(self.aggregator);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| StatsServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "stats server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| StatsServerError::ServerFailed(e.to_string()))?;

        tracing::info!("stats server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn stats_handler(State(aggregator): State<StatsAggregator>) -> impl IntoResponse {
    Json(aggregator.snapshot())
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

// =============================================================================
// Errors
// =============================================================================

/// Stats server errors.
#[derive(Debug, thiserror::Error)]
pub enum StatsServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

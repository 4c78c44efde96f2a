//! SSE Feed Reader
//!
//! Opens a long-lived HTTP GET against the change-event feed, reads the
//! response body as a buffered line stream, and publishes every `data:`
//! line's JSON payload as an encoded event through the
//! [`EventPublisher`] port.
//!
//! Publication is fire-and-forget from the reader's perspective; delivery
//! acknowledgements only affect logging and never block or stop the read
//! loop.

use futures_util::TryStreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::application::ports::EventPublisher;
use crate::domain::event::ChangeEvent;
use crate::infrastructure::{metrics, wire};

/// Prefix marking feed lines that carry an event payload.
const DATA_PREFIX: &str = "data:";

// =============================================================================
// Error Type
// =============================================================================

/// Errors returned by the feed reader.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The configured feed URL is not an absolute http(s) URL.
    #[error("invalid stream URL {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP request could not be issued.
    #[error("failed to fetch stream: {0}")]
    Connect(#[from] reqwest::Error),

    /// Reading a line from the response body failed (other than
    /// end-of-stream, which terminates the loop successfully).
    #[error("error reading line: {0}")]
    Read(#[from] std::io::Error),

    /// The shared cancellation signal fired.
    ///
    /// Callers treat this as a clean shutdown, distinct from I/O failure.
    #[error("stream processing cancelled")]
    Cancelled,
}

// =============================================================================
// Feed Loop
// =============================================================================

/// Read the feed at `url` and publish every event until the stream ends or
/// the cancellation token fires.
///
/// Returns `Ok(())` on end-of-stream. Malformed JSON on an individual line
/// is logged and skipped; the loop continues.
///
/// # Errors
///
/// - [`FeedError::InvalidUrl`] before connecting, if the URL is not absolute
///   http(s); fatal to producer startup.
/// - [`FeedError::Cancelled`] when the token fires, abandoning any
///   partially-read line.
/// - [`FeedError::Connect`] / [`FeedError::Read`] on transport failures.
pub async fn stream_and_publish(
    url: &str,
    publisher: &dyn EventPublisher,
    cancel: &CancellationToken,
) -> Result<(), FeedError> {
    let parsed = validate_stream_url(url)?;

    tracing::info!(url = %parsed, "connecting to change-event feed");
    let response = reqwest::get(parsed).await?;

    let body = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
    process_lines(BufReader::new(body), publisher, cancel).await
}

/// Validate that the feed URL is absolute http(s).
fn validate_stream_url(url: &str) -> Result<reqwest::Url, FeedError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FeedError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FeedError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {:?}", parsed.scheme()),
        });
    }

    Ok(parsed)
}

/// Read lines from the feed body, publishing each `data:` payload.
///
/// Split from [`stream_and_publish`] so tests can drive the loop from an
/// in-memory reader.
///
/// # Errors
///
/// See [`stream_and_publish`].
pub async fn process_lines<R>(
    reader: R,
    publisher: &dyn EventPublisher,
    cancel: &CancellationToken,
) -> Result<(), FeedError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("feed reader cancelled");
                return Err(FeedError::Cancelled);
            }
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&line, publisher),
                // end of stream
                None => return Ok(()),
            },
        }
    }
}

/// Decode and publish one feed line; non-`data:` lines are ignored.
fn handle_line(line: &str, publisher: &dyn EventPublisher) {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return;
    };

    match serde_json::from_str::<ChangeEvent>(payload.trim()) {
        Ok(event) => {
            metrics::record_feed_event();
            publisher.publish(wire::encode(&event));
        }
        Err(error) => {
            metrics::record_malformed_line();
            tracing::warn!(%error, "failed to parse feed line, skipping");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Broker Wire Codec
//!
//! Fixed, versionless binary encoding for one change event, using a
//! field-tagged protobuf schema so unset/default fields are omitted
//! compactly:
//!
//! | field        | tag | type   |
//! |--------------|-----|--------|
//! | `user`       | 1   | string |
//! | `bot`        | 2   | bool   |
//! | `server_url` | 3   | string |
//!
//! Decode failures must be treated by callers as "skip this one record",
//! never as fatal.

use prost::Message;

use crate::domain::event::ChangeEvent;

/// Wire-format decode error.
#[derive(Debug, thiserror::Error)]
#[error("malformed event record: {0}")]
pub struct WireError(#[from] prost::DecodeError);

/// Protobuf message mirroring [`ChangeEvent`] on the wire.
#[derive(Clone, PartialEq, Message)]
struct ChangeEventRecord {
    #[prost(string, tag = "1")]
    user: String,
    #[prost(bool, tag = "2")]
    bot: bool,
    #[prost(string, tag = "3")]
    server_url: String,
}

/// Encode one event to its binary wire form.
#[must_use]
pub fn encode(event: &ChangeEvent) -> Vec<u8> {
    ChangeEventRecord {
        user: event.user.clone(),
        bot: event.bot,
        server_url: event.server_url.clone(),
    }
    .encode_to_vec()
}

/// Decode one event from its binary wire form.
///
/// # Errors
///
/// Returns [`WireError`] on malformed input.
pub fn decode(bytes: &[u8]) -> Result<ChangeEvent, WireError> {
    let record = ChangeEventRecord::decode(bytes)?;
    Ok(ChangeEvent {
        user: record.user,
        bot: record.bot,
        server_url: record.server_url,
    })
}

// =============================================================================
// Tests
// =============================================================================

//! Change Event Type
//!
//! The canonical internal representation of one change event, produced by
//! decoding one feed line or one broker record and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// One change event from the public feed.
///
/// Deserializes directly from the JSON object carried on a `data:` feed
/// line; unknown fields in the feed payload are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Name of the user that made the change.
    pub user: String,
    /// Whether the change was made by a bot account.
    pub bot: bool,
    /// Origin URL of the wiki the change was made on.
    pub server_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_feed_payload() {
        let event: ChangeEvent =
            serde_json::from_str(r#"{"user":"blub_user","bot":false,"server_url":"https://blub.com"}"#)
                .unwrap();

        assert_eq!(event.user, "blub_user");
        assert!(!event.bot);
        assert_eq!(event.server_url, "https://blub.com");
    }

    #[test]
    fn ignores_unknown_feed_fields() {
        let json = r#"{"user":"a","bot":true,"server_url":"https://b.org","wiki":"enwiki","id":123}"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.user, "a");
        assert!(event.bot);
    }

    #[test]
    fn missing_field_is_an_error() {
        let result = serde_json::from_str::<ChangeEvent>(r#"{"user":"a"}"#);
        assert!(result.is_err());
    }
}

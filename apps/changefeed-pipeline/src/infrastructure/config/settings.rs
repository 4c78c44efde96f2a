//! Pipeline Configuration Settings
//!
//! Configuration types for both binaries, loaded from environment
//! variables. `STREAM_URL` is required; everything else has defaults.

use std::time::Duration;

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    /// Bootstrap broker list, `host:port[,host:port...]`.
    pub brokers: String,
    /// Topic events are published to and consumed from.
    pub topic: String,
    /// Consumer-group identity for offset tracking.
    pub group: String,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "wikimedia-changes".to_string(),
            group: "wikimedia-consumer-group".to_string(),
        }
    }
}

/// Persistence backend settings.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Use the Scylla backend instead of the in-memory store.
    pub use_scylla: bool,
    /// Scylla contact points.
    pub scylla_hosts: Vec<String>,
    /// Keyspace holding the stats table.
    pub scylla_keyspace: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            use_scylla: false,
            scylla_hosts: vec!["scylla:9042".to_string()],
            scylla_keyspace: "stats_data".to_string(),
        }
    }
}

/// HTTP server settings for the consumer binary.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port serving `/stats`, `/healthz`, and `/metrics`.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 7000 }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// URL of the change-event SSE feed.
    pub stream_url: String,
    /// Broker settings.
    pub kafka: KafkaSettings,
    /// Persistence settings.
    pub storage: StorageSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Cadence of the periodic snapshot save.
    pub save_interval: Duration,
    /// Number of concurrent consume loops to run.
    pub consumer_instances: usize,
}

impl PipelineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `STREAM_URL` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let stream_url = std::env::var("STREAM_URL")
            .map_err(|_| ConfigError::MissingEnvVar("STREAM_URL".to_string()))?;
        if stream_url.is_empty() {
            return Err(ConfigError::EmptyValue("STREAM_URL".to_string()));
        }

        let kafka = KafkaSettings {
            brokers: env_or("KAFKA_BROKERS", KafkaSettings::default().brokers),
            topic: env_or("KAFKA_TOPIC", KafkaSettings::default().topic),
            group: env_or("KAFKA_GROUP", KafkaSettings::default().group),
        };

        let storage = StorageSettings {
            use_scylla: parse_env_bool("USE_SCYLLA", StorageSettings::default().use_scylla),
            scylla_hosts: std::env::var("SCYLLA_HOSTS")
                .map(|v| v.split(',').map(|h| h.trim().to_string()).collect())
                .unwrap_or_else(|_| StorageSettings::default().scylla_hosts),
            scylla_keyspace: env_or(
                "SCYLLA_KEYSPACE",
                StorageSettings::default().scylla_keyspace,
            ),
        };

        let server = ServerSettings {
            http_port: parse_env_u16("HTTP_PORT", ServerSettings::default().http_port),
        };

        Ok(Self {
            stream_url,
            kafka,
            storage,
            server,
            save_interval: parse_env_duration_secs("SAVE_INTERVAL_SECS", Duration::from_secs(60)),
            consumer_instances: parse_env_usize("CONSUMER_INSTANCES", 1).max(1),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).ok().map_or(default, |v| parse_bool(&v))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kafka_defaults() {
        let settings = KafkaSettings::default();
        assert_eq!(settings.brokers, "localhost:9092");
        assert_eq!(settings.topic, "wikimedia-changes");
        assert_eq!(settings.group, "wikimedia-consumer-group");
    }

    #[test]
    fn storage_defaults() {
        let settings = StorageSettings::default();
        assert!(!settings.use_scylla);
        assert_eq!(settings.scylla_hosts, vec!["scylla:9042".to_string()]);
        assert_eq!(settings.scylla_keyspace, "stats_data");
    }

    #[test]
    fn server_defaults() {
        assert_eq!(ServerSettings::default().http_port, 7000);
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        for truthy in ["1", "true", "TRUE", "yes"] {
            assert!(parse_bool(truthy));
        }
        for falsy in ["0", "false", "no", "off", ""] {
            assert!(!parse_bool(falsy));
        }
    }
}

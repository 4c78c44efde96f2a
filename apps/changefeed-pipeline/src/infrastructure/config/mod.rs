//! Configuration Module
//!
//! Configuration loading for the pipeline binaries.

mod settings;

pub use settings::{ConfigError, KafkaSettings, PipelineConfig, ServerSettings, StorageSettings};

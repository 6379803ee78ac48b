// src/config/mod.rs
//! Typed engine configuration, loaded once at startup.

pub mod monitor;

pub use monitor::{
    AlertThresholds, AlertsConfig, AnalyticsConfig, EngineConfig, ModelConfig, NeuralConfig,
    PerformanceConfig, SentimentConfig, TextProcessingConfig, DEFAULT_CONFIG_PATH,
    ENV_ALERTS_ENABLED, ENV_CONFIDENCE_THRESHOLD, ENV_CONFIG_PATH, LEXICON_MODEL_ID, NEURAL_MODEL_ID,
};

use std::path::PathBuf;

/// Configuration problems that must stop startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("model `{model}` has negative weight {weight}")]
    NegativeWeight { model: String, weight: f64 },
    #[error("`{field}` = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("`{field}` must be greater than zero")]
    Zero { field: &'static str },
    #[error("alert thresholds must satisfy very_negative <= negative <= positive <= very_positive")]
    ThresholdOrder,
    #[error("label thresholds must satisfy negative_label_threshold < positive_label_threshold")]
    LabelOrder,
}

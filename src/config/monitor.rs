// src/config/monitor.rs
//! TOML-backed configuration for the scoring engine and analytics.
//!
//! Every section and key is optional; absent keys fall back to the defaults
//! below. Shape:
//!
//! ```toml
//! [text_processing]
//! max_text_length = 1000
//! remove_urls = true
//!
//! [sentiment]
//! confidence_threshold = 0.7
//! [sentiment.models.lexicon]
//! weight = 0.4
//! [sentiment.models.neural]
//! enabled = true
//! weight = 0.6
//!
//! [alerts]
//! volume_threshold = 10
//! [alerts.thresholds]
//! very_negative = -0.8
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";
pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "MONITOR_CONFIDENCE_THRESHOLD";
pub const ENV_ALERTS_ENABLED: &str = "MONITOR_ALERTS_ENABLED";

/// Model ids of the built-in adapters.
pub const LEXICON_MODEL_ID: &str = "lexicon";
pub const NEURAL_MODEL_ID: &str = "neural";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub text_processing: TextProcessingConfig,
    pub sentiment: SentimentConfig,
    pub alerts: AlertsConfig,
    pub analytics: AnalyticsConfig,
    pub performance: PerformanceConfig,
    pub neural: NeuralConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProcessingConfig {
    pub max_text_length: usize,
    pub remove_urls: bool,
    pub remove_mentions: bool,
    pub remove_hashtags: bool,
    pub handle_emojis: bool,
}

impl Default for TextProcessingConfig {
    fn default() -> Self {
        Self {
            max_text_length: 1000,
            remove_urls: true,
            remove_mentions: false,
            remove_hashtags: false,
            handle_emojis: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub models: BTreeMap<String, ModelConfig>,
    /// Aggregates at or above this confidence are flagged `high_confidence`.
    pub confidence_threshold: f64,
    pub positive_label_threshold: f64,
    pub negative_label_threshold: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(LEXICON_MODEL_ID.to_string(), ModelConfig::weighted(0.4));
        models.insert(NEURAL_MODEL_ID.to_string(), ModelConfig::weighted(0.6));
        Self {
            models,
            confidence_threshold: 0.7,
            positive_label_threshold: 0.05,
            negative_label_threshold: -0.05,
        }
    }
}

impl SentimentConfig {
    /// `model_id -> weight` for every enabled model.
    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.models
            .iter()
            .filter(|(_, m)| m.enabled)
            .map(|(id, m)| (id.clone(), m.weight))
            .collect()
    }

    /// Unlisted models count as enabled.
    pub fn is_enabled(&self, model_id: &str) -> bool {
        self.models.get(model_id).map_or(true, |m| m.enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ModelConfig {
    pub fn weighted(weight: f64) -> Self {
        Self {
            enabled: true,
            weight,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    pub thresholds: AlertThresholds,
    /// Posts per summary window above which a volume spike fires.
    pub volume_threshold: u64,
    pub rapid_change_threshold: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thresholds: AlertThresholds::default(),
            volume_threshold: 10,
            rapid_change_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub very_negative: f64,
    pub negative: f64,
    pub positive: f64,
    pub very_positive: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            very_negative: -0.8,
            negative: -0.3,
            positive: 0.3,
            very_positive: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Samples below this confidence are not fed to the time-series analyzers.
    pub min_sample_confidence: f64,
    pub default_window_hours: u32,
    /// Largest window a caller may ask for.
    pub max_window_hours: u32,
    pub alert_summary_hours: u32,
    pub alert_trend_hours: u32,
    /// Stored scores older than this are dropped. 0 keeps everything.
    pub retention_hours: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_sample_confidence: 0.5,
            default_window_hours: 24,
            max_window_hours: 720,
            alert_summary_hours: 1,
            alert_trend_hours: 6,
            retention_hours: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub adapter_timeout_ms: u64,
    /// Texts scored concurrently within one batch.
    pub max_concurrency: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_ms: 5_000,
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    /// Inference endpoint; the neural adapter stays unavailable without one.
    pub endpoint: Option<String>,
    /// Name of the env var holding the bearer token (never the token itself).
    pub api_token_env: String,
    pub max_tokens: usize,
    pub request_timeout_ms: u64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token_env: "HF_API_TOKEN".to_string(),
            max_tokens: 512,
            request_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut root: toml::Table = toml::from_str(s)?;
        fill_builtin_weights(&mut root);
        let mut cfg: EngineConfig = toml::Value::Table(root).try_into()?;
        // a partial [sentiment.models] table keeps the built-in entries it doesn't mention
        for (id, model) in SentimentConfig::default().models {
            cfg.sentiment.models.entry(id).or_insert(model);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(s) => {
                let cfg = Self::from_toml_str(&s)?;
                info!(target: "config", path = %path.display(), "engine config loaded");
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(target: "config", path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load using env var + fallback, then apply env overrides:
    /// 1) $MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_unit_env(std::env::var(ENV_CONFIDENCE_THRESHOLD).ok()) {
            self.sentiment.confidence_threshold = t;
        }
        if let Ok(v) = std::env::var(ENV_ALERTS_ENABLED) {
            self.alerts.enabled = !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text_processing.max_text_length == 0 {
            return Err(ConfigError::Zero {
                field: "text_processing.max_text_length",
            });
        }
        for (model, m) in &self.sentiment.models {
            if m.weight < 0.0 || !m.weight.is_finite() {
                return Err(ConfigError::NegativeWeight {
                    model: model.clone(),
                    weight: m.weight,
                });
            }
        }
        unit_range("sentiment.confidence_threshold", self.sentiment.confidence_threshold)?;
        unit_range(
            "analytics.min_sample_confidence",
            self.analytics.min_sample_confidence,
        )?;
        if self.sentiment.negative_label_threshold >= self.sentiment.positive_label_threshold {
            return Err(ConfigError::LabelOrder);
        }

        let t = &self.alerts.thresholds;
        if !(t.very_negative <= t.negative && t.negative <= t.positive && t.positive <= t.very_positive)
        {
            return Err(ConfigError::ThresholdOrder);
        }
        if self.alerts.rapid_change_threshold < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "alerts.rapid_change_threshold",
                value: self.alerts.rapid_change_threshold,
                min: 0.0,
                max: 2.0,
            });
        }

        if self.performance.adapter_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "performance.adapter_timeout_ms",
            });
        }
        if self.performance.max_concurrency == 0 {
            return Err(ConfigError::Zero {
                field: "performance.max_concurrency",
            });
        }
        if self.neural.max_tokens < 3 {
            return Err(ConfigError::OutOfRange {
                field: "neural.max_tokens",
                value: self.neural.max_tokens as f64,
                min: 3.0,
                max: f64::MAX,
            });
        }
        for (field, hours) in [
            ("analytics.default_window_hours", self.analytics.default_window_hours),
            ("analytics.alert_summary_hours", self.analytics.alert_summary_hours),
            ("analytics.alert_trend_hours", self.analytics.alert_trend_hours),
        ] {
            if hours == 0 {
                return Err(ConfigError::Zero { field });
            }
            if hours > self.analytics.max_window_hours {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: f64::from(hours),
                    min: 1.0,
                    max: f64::from(self.analytics.max_window_hours),
                });
            }
        }
        Ok(())
    }
}

/// A built-in model table without `weight` keeps the built-in weight, not 1.0.
fn fill_builtin_weights(root: &mut toml::Table) {
    let Some(models) = root
        .get_mut("sentiment")
        .and_then(|s| s.get_mut("models"))
        .and_then(toml::Value::as_table_mut)
    else {
        return;
    };
    for (id, builtin) in SentimentConfig::default().models {
        if let Some(entry) = models.get_mut(&id).and_then(toml::Value::as_table_mut) {
            entry
                .entry("weight")
                .or_insert(toml::Value::Float(builtin.weight));
        }
    }
}

fn unit_range(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_unit_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

// src/analytics/mod.rs
//! Time-series analyzers over per-topic sentiment samples.
//!
//! Every entry point is total: it takes a borrowed slice, never mutates it,
//! and answers thin or degenerate input with a sentinel instead of an error.

pub mod anomaly;
pub mod correlation;
pub mod momentum;
pub mod stats;
pub mod trend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use anomaly::{detect_anomalies, AnomalyKind, AnomalyRecord, AnomalySeverity};
pub use correlation::{
    analyze_volume_correlation, CorrelationResult, CorrelationStrength, HourlyBucket, VolumeTrend,
};
pub use momentum::{calculate_momentum, MomentumResult, MomentumSignal};
pub use trend::{analyze_trend, TrendDirection, TrendResult};

/// One scored record on a topic's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    pub timestamp: DateTime<Utc>,
    pub sentiment: f64,
    pub confidence: f64,
}

impl SentimentSample {
    pub fn new(timestamp: DateTime<Utc>, sentiment: f64, confidence: f64) -> Self {
        Self {
            timestamp,
            sentiment,
            confidence,
        }
    }
}

/// Result of an analyzer with a minimum sample count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ready(T),
    InsufficientData { required: usize, available: usize },
}

impl<T> Outcome<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Outcome::Ready(v) => Some(v),
            Outcome::InsufficientData { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }
}

/// Copy of `samples` in ascending time order (stable for equal timestamps).
pub(crate) fn sorted_by_time(samples: &[SentimentSample]) -> Vec<SentimentSample> {
    let mut v = samples.to_vec();
    v.sort_by_key(|s| s.timestamp);
    v
}

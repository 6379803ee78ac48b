// src/analytics/anomaly.rs
//! Z-score spikes against a trailing baseline.
//!
//! Each sample is compared with the `w` samples right before it, so a spike
//! never dilutes its own baseline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats::{mean, sample_std};
use super::{sorted_by_time, SentimentSample};

pub const MIN_ANOMALY_SAMPLES: usize = 20;
const MAX_WINDOW: usize = 10;
const FLAG_Z: f64 = 2.0;
const HIGH_Z: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    PositiveSpike,
    NegativeSpike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub timestamp: DateTime<Utc>,
    pub sentiment: f64,
    pub z_score: f64,
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    /// |sentiment - rolling mean|
    pub deviation: f64,
}

pub fn detect_anomalies(samples: &[SentimentSample]) -> Vec<AnomalyRecord> {
    let n = samples.len();
    if n < MIN_ANOMALY_SAMPLES {
        return Vec::new();
    }
    let sorted = sorted_by_time(samples);
    let values: Vec<f64> = sorted.iter().map(|s| s.sentiment).collect();
    let w = MAX_WINDOW.min(n / 2);

    let mut out = Vec::new();
    for i in w..n {
        let window = &values[i - w..i];
        let rolling_mean = mean(window);
        let rolling_std = sample_std(window);
        let x = values[i];
        let z = if rolling_std > 0.0 {
            (x - rolling_mean) / rolling_std
        } else {
            0.0
        };
        if !z.is_finite() || z.abs() <= FLAG_Z {
            continue;
        }
        out.push(AnomalyRecord {
            timestamp: sorted[i].timestamp,
            sentiment: x,
            z_score: z,
            kind: if z > 0.0 {
                AnomalyKind::PositiveSpike
            } else {
                AnomalyKind::NegativeSpike
            },
            severity: if z.abs() > HIGH_Z {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            },
            deviation: (x - rolling_mean).abs(),
        });
    }
    out
}

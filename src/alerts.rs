// src/alerts.rs
//! Alert conditions derived from a window summary and a short-horizon trend.

use serde::{Deserialize, Serialize};

use crate::analytics::TrendResult;
use crate::config::AlertsConfig;
use crate::storage::WindowSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SentimentThreshold,
    VolumeSpike,
    RapidChange,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::SentimentThreshold => "sentiment_threshold",
            AlertKind::VolumeSpike => "volume_spike",
            AlertKind::RapidChange => "rapid_change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub current_value: f64,
    pub threshold_value: f64,
    pub triggered: bool,
}

impl AlertCondition {
    fn fired(
        kind: AlertKind,
        severity: AlertSeverity,
        message: String,
        current_value: f64,
        threshold_value: f64,
    ) -> Self {
        Self {
            kind,
            severity,
            message,
            current_value,
            threshold_value,
            triggered: true,
        }
    }
}

/// Ordered: sentiment tier, volume spike, rapid change. At most one tier fires.
pub fn evaluate_alerts(summary: &WindowSummary, trend: &TrendResult, cfg: &AlertsConfig) -> Vec<AlertCondition> {
    let mut out = Vec::new();
    if !cfg.enabled {
        return out;
    }

    let t = &cfg.thresholds;
    let avg = summary.avg_sentiment;
    let tier = if avg <= t.very_negative {
        Some((
            AlertSeverity::Critical,
            format!("Very negative sentiment detected: {avg:.3}"),
            t.very_negative,
        ))
    } else if avg <= t.negative {
        Some((
            AlertSeverity::High,
            format!("Negative sentiment detected: {avg:.3}"),
            t.negative,
        ))
    } else if avg >= t.very_positive {
        Some((
            AlertSeverity::Low,
            format!("Very positive sentiment detected: {avg:.3}"),
            t.very_positive,
        ))
    } else {
        None
    };
    if let Some((severity, message, threshold)) = tier {
        out.push(AlertCondition::fired(
            AlertKind::SentimentThreshold,
            severity,
            message,
            avg,
            threshold,
        ));
    }

    if summary.post_count > cfg.volume_threshold {
        out.push(AlertCondition::fired(
            AlertKind::VolumeSpike,
            AlertSeverity::Medium,
            format!("High volume detected: {} posts in last hour", summary.post_count),
            summary.post_count as f64,
            cfg.volume_threshold as f64,
        ));
    }

    let change = trend.change;
    if change.abs() > cfg.rapid_change_threshold {
        let direction = if change > 0.0 { "improvement" } else { "decline" };
        out.push(AlertCondition::fired(
            AlertKind::RapidChange,
            AlertSeverity::Medium,
            format!("Rapid sentiment {direction}: {change:.3} change"),
            change.abs(),
            cfg.rapid_change_threshold,
        ));
    }

    out
}

// src/insights.rs
//! Insight bundles, recommendation rules and cross-topic comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::{AlertCondition, AlertSeverity};
use crate::analytics::stats::{mean, population_std};
use crate::analytics::{
    AnomalyRecord, CorrelationResult, MomentumResult, MomentumSignal, Outcome, TrendDirection, TrendResult,
};
use crate::storage::WindowSummary;

pub const MAX_RECOMMENDATIONS: usize = 5;

const LOW_VOLUME: u64 = 10;
const HIGH_VOLUME: u64 = 100;
const STRONG_SENTIMENT: f64 = 0.5;
const CONFIDENT_TREND: f64 = 0.7;
const MANY_ANOMALIES: usize = 2;
const HIGH_VOLATILITY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub topic: String,
    pub window_hours: u32,
    pub generated_at: DateTime<Utc>,
    pub summary: WindowSummary,
    pub trend: TrendResult,
    pub momentum: Outcome<MomentumResult>,
    pub correlation: Outcome<CorrelationResult>,
    pub anomalies: Vec<AnomalyRecord>,
    pub alerts: Vec<AlertCondition>,
    pub recommendations: Vec<String>,
}

/// Everything an insight is built from, fetched by the caller.
#[derive(Debug, Clone)]
pub struct InsightInputs {
    pub summary: WindowSummary,
    pub trend: TrendResult,
    pub momentum: Outcome<MomentumResult>,
    pub correlation: Outcome<CorrelationResult>,
    pub anomalies: Vec<AnomalyRecord>,
    pub alerts: Vec<AlertCondition>,
}

pub fn compose_insight(
    topic: &str,
    window_hours: u32,
    generated_at: DateTime<Utc>,
    inputs: InsightInputs,
) -> Insight {
    let recommendations = recommendations(
        &inputs.summary,
        &inputs.trend,
        &inputs.momentum,
        &inputs.alerts,
        &inputs.anomalies,
    );
    Insight {
        topic: topic.to_string(),
        window_hours,
        generated_at,
        summary: inputs.summary,
        trend: inputs.trend,
        momentum: inputs.momentum,
        correlation: inputs.correlation,
        anomalies: inputs.anomalies,
        alerts: inputs.alerts,
        recommendations,
    }
}

/// Rules fire in a fixed order; the first five survive.
pub fn recommendations(
    summary: &WindowSummary,
    trend: &TrendResult,
    momentum: &Outcome<MomentumResult>,
    alerts: &[AlertCondition],
    anomalies: &[AnomalyRecord],
) -> Vec<String> {
    let mut out: Vec<&'static str> = Vec::new();

    if summary.post_count < LOW_VOLUME {
        out.push("Consider expanding data collection - low post volume detected");
    } else if summary.post_count > HIGH_VOLUME {
        out.push("High engagement detected - monitor for emerging trends");
    }

    if summary.avg_sentiment < -STRONG_SENTIMENT {
        out.push("Negative sentiment detected - investigate potential issues or crises");
    } else if summary.avg_sentiment > STRONG_SENTIMENT {
        out.push("Positive sentiment detected - consider leveraging this momentum");
    }

    match trend.direction {
        TrendDirection::Declining if trend.confidence > CONFIDENT_TREND => {
            out.push("Strong declining trend - immediate attention recommended")
        }
        TrendDirection::Improving if trend.confidence > CONFIDENT_TREND => {
            out.push("Strong positive trend - monitor for optimization opportunities")
        }
        _ => {}
    }

    let momentum = momentum.ready();
    match momentum.map(|m| m.signal) {
        Some(MomentumSignal::Bearish) => {
            out.push("Bearish momentum - prepare for potential negative sentiment increase")
        }
        Some(MomentumSignal::Bullish) => {
            out.push("Bullish momentum - positive sentiment trend likely to continue")
        }
        _ => {}
    }

    if alerts.iter().any(|a| a.severity == AlertSeverity::Critical) {
        out.push("Critical alerts detected - immediate response required");
    }

    if anomalies.len() > MANY_ANOMALIES {
        out.push("Multiple anomalies detected - investigate unusual activity");
    }

    if momentum.is_some_and(|m| m.volatility > HIGH_VOLATILITY) {
        out.push("High volatility detected - sentiment may be unstable");
    }

    out.into_iter().take(MAX_RECOMMENDATIONS).map(String::from).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSnapshot {
    pub topic: String,
    pub avg_sentiment: f64,
    pub post_count: u64,
    pub positive_ratio: f64,
    pub negative_ratio: f64,
    pub trend_direction: TrendDirection,
    pub trend_strength: f64,
    pub confidence: f64,
}

impl TopicSnapshot {
    pub fn new(topic: &str, summary: &WindowSummary, trend: &TrendResult) -> Self {
        Self {
            topic: topic.to_string(),
            avg_sentiment: summary.avg_sentiment,
            post_count: summary.post_count,
            positive_ratio: summary.positive_ratio(),
            negative_ratio: summary.negative_ratio(),
            trend_direction: trend.direction,
            trend_strength: trend.strength,
            confidence: summary.avg_confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicComparison {
    pub topics: Vec<TopicSnapshot>,
    pub best_performing: String,
    pub worst_performing: String,
    pub most_discussed: String,
    pub sentiment_range: f64,
    pub volume_range: u64,
    pub average_sentiment: f64,
    /// Population standard deviation of the per-topic averages.
    pub sentiment_std: f64,
}

/// `None` for an empty list. Ties resolve to the earliest topic.
pub fn compare_topics(snapshots: Vec<TopicSnapshot>) -> Option<TopicComparison> {
    let first = snapshots.first()?;

    let mut best = first;
    let mut worst = first;
    let mut busiest = first;
    for s in &snapshots[1..] {
        if s.avg_sentiment > best.avg_sentiment {
            best = s;
        }
        if s.avg_sentiment < worst.avg_sentiment {
            worst = s;
        }
        if s.post_count > busiest.post_count {
            busiest = s;
        }
    }

    let sentiments: Vec<f64> = snapshots.iter().map(|s| s.avg_sentiment).collect();
    let max_volume = snapshots.iter().map(|s| s.post_count).max().unwrap_or(0);
    let min_volume = snapshots.iter().map(|s| s.post_count).min().unwrap_or(0);

    Some(TopicComparison {
        best_performing: best.topic.clone(),
        worst_performing: worst.topic.clone(),
        most_discussed: busiest.topic.clone(),
        sentiment_range: best.avg_sentiment - worst.avg_sentiment,
        volume_range: max_volume - min_volume,
        average_sentiment: mean(&sentiments),
        sentiment_std: population_std(&sentiments),
        topics: snapshots,
    })
}

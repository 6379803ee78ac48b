// src/analytics/correlation.rs
//! Hourly volume vs. hourly mean sentiment.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stats::{mean, pearson, sample_std};
use super::{Outcome, SentimentSample};

pub const MIN_CORRELATION_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Weak,
    Moderate,
    Strong,
}

impl CorrelationStrength {
    pub fn classify(coefficient: f64) -> Self {
        let r = coefficient.abs();
        if r > 0.7 {
            CorrelationStrength::Strong
        } else if r > 0.3 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: DateTime<Utc>,
    pub avg_sentiment: f64,
    pub sentiment_std: f64,
    pub volume: usize,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub coefficient: f64,
    pub strength: CorrelationStrength,
    pub volume_trend: VolumeTrend,
    pub peak_volume_hour: DateTime<Utc>,
    pub peak_sentiment_hour: DateTime<Utc>,
    pub avg_hourly_volume: f64,
    pub hourly: Vec<HourlyBucket>,
}

fn floor_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

pub fn hourly_buckets(samples: &[SentimentSample]) -> Vec<HourlyBucket> {
    let mut by_hour: BTreeMap<DateTime<Utc>, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for s in samples {
        let slot = by_hour.entry(floor_hour(s.timestamp)).or_default();
        slot.0.push(s.sentiment);
        slot.1.push(s.confidence);
    }
    by_hour
        .into_iter()
        .map(|(hour, (sent, conf))| HourlyBucket {
            hour,
            avg_sentiment: mean(&sent),
            sentiment_std: sample_std(&sent),
            volume: sent.len(),
            avg_confidence: mean(&conf),
        })
        .collect()
}

/// First bucket holding the maximum of `key`.
fn first_max_by(buckets: &[HourlyBucket], key: impl Fn(&HourlyBucket) -> f64) -> usize {
    let mut best = 0;
    for (i, b) in buckets.iter().enumerate().skip(1) {
        if key(b) > key(&buckets[best]) {
            best = i;
        }
    }
    best
}

pub fn analyze_volume_correlation(samples: &[SentimentSample]) -> Outcome<CorrelationResult> {
    if samples.len() < MIN_CORRELATION_SAMPLES {
        return Outcome::InsufficientData {
            required: MIN_CORRELATION_SAMPLES,
            available: samples.len(),
        };
    }

    let hourly = hourly_buckets(samples);
    let volumes: Vec<f64> = hourly.iter().map(|b| b.volume as f64).collect();
    let sentiments: Vec<f64> = hourly.iter().map(|b| b.avg_sentiment).collect();
    let coefficient = pearson(&volumes, &sentiments);

    let (first, last) = (&hourly[0], &hourly[hourly.len() - 1]);
    let volume_trend = if last.volume > first.volume {
        VolumeTrend::Increasing
    } else {
        VolumeTrend::Decreasing
    };

    let peak_volume_hour = hourly[first_max_by(&hourly, |b| b.volume as f64)].hour;
    let peak_sentiment_hour = hourly[first_max_by(&hourly, |b| b.avg_sentiment)].hour;

    Outcome::Ready(CorrelationResult {
        coefficient,
        strength: CorrelationStrength::classify(coefficient),
        volume_trend,
        peak_volume_hour,
        peak_sentiment_hour,
        avg_hourly_volume: mean(&volumes),
        hourly,
    })
}

// src/analytics/momentum.rs
//! Moving-average momentum of the most recent samples.

use serde::{Deserialize, Serialize};

use super::stats::{mean, sample_std};
use super::{sorted_by_time, Outcome, SentimentSample};

pub const MIN_MOMENTUM_SAMPLES: usize = 5;
const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 10;
const ROC_PERIODS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumSignal {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumResult {
    pub current: f64,
    pub sma_5: f64,
    pub sma_10: f64,
    pub signal: MomentumSignal,
    pub volatility: f64,
    pub rate_of_change: f64,
    pub strength: f64,
}

pub fn calculate_momentum(samples: &[SentimentSample]) -> Outcome<MomentumResult> {
    let n = samples.len();
    if n < MIN_MOMENTUM_SAMPLES {
        return Outcome::InsufficientData {
            required: MIN_MOMENTUM_SAMPLES,
            available: n,
        };
    }

    let values: Vec<f64> = sorted_by_time(samples).iter().map(|s| s.sentiment).collect();
    let current = values[n - 1];
    let sma_5 = mean(last_n(&values, SHORT_WINDOW));
    let sma_10 = mean(last_n(&values, LONG_WINDOW));

    let signal = if current > sma_5 && sma_5 > sma_10 {
        MomentumSignal::Bullish
    } else if current < sma_5 && sma_5 < sma_10 {
        MomentumSignal::Bearish
    } else {
        MomentumSignal::Neutral
    };

    let volatility = sample_std(last_n(&values, LONG_WINDOW));

    let k = ROC_PERIODS.min(n - 1);
    let rate_of_change = if k == 0 {
        0.0
    } else {
        (current - values[n - 1 - k]) / k as f64
    };

    let strength = if volatility < 1.0 {
        rate_of_change.abs() * (1.0 - volatility)
    } else {
        0.0
    };

    Outcome::Ready(MomentumResult {
        current,
        sma_5,
        sma_10,
        signal,
        volatility,
        rate_of_change,
        strength,
    })
}

fn last_n(values: &[f64], k: usize) -> &[f64] {
    &values[values.len() - k.min(values.len())..]
}

// src/analytics/trend.rs
//! Linear trend of sentiment over elapsed hours.

use serde::{Deserialize, Serialize};

use super::stats::linregress;
use super::{sorted_by_time, SentimentSample};

/// Fewer samples than this cannot carry a trend.
pub const MIN_TREND_SAMPLES: usize = 3;

/// Slopes (sentiment per hour) below this magnitude count as flat.
const STABLE_SLOPE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    /// |r|
    pub strength: f64,
    /// last - first sentiment.
    pub change: f64,
    pub confidence: f64,
    pub sample_count: usize,
    pub r_squared: f64,
}

impl TrendResult {
    fn blank(direction: TrendDirection, sample_count: usize) -> Self {
        Self {
            direction,
            strength: 0.0,
            change: 0.0,
            confidence: 0.0,
            sample_count,
            r_squared: 0.0,
        }
    }

    pub fn insufficient(sample_count: usize) -> Self {
        Self::blank(TrendDirection::InsufficientData, sample_count)
    }
}

pub fn analyze_trend(samples: &[SentimentSample]) -> TrendResult {
    let n = samples.len();
    if n < MIN_TREND_SAMPLES {
        return TrendResult::insufficient(n);
    }

    let sorted = sorted_by_time(samples);
    let t0 = sorted[0].timestamp;
    let xs: Vec<f64> = sorted
        .iter()
        .map(|s| (s.timestamp - t0).num_milliseconds() as f64 / 3_600_000.0)
        .collect();
    let ys: Vec<f64> = sorted.iter().map(|s| s.sentiment).collect();

    let Some(fit) = linregress(&xs, &ys) else {
        return TrendResult::blank(TrendDirection::Error, 0);
    };

    let direction = if fit.slope.abs() < STABLE_SLOPE {
        TrendDirection::Stable
    } else if fit.slope > 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Declining
    };

    let r_squared = fit.r * fit.r;
    let change = ys[n - 1] - ys[0];
    if !change.is_finite() {
        return TrendResult::blank(TrendDirection::Error, 0);
    }

    TrendResult {
        direction,
        strength: fit.r.abs(),
        change,
        confidence: (r_squared * (n as f64 / 10.0)).min(1.0),
        sample_count: n,
        r_squared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(values: &[f64]) -> Vec<SentimentSample> {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SentimentSample::new(t0 + Duration::minutes(30 * i as i64), *v, 0.8))
            .collect()
    }

    #[test]
    fn under_three_is_insufficient() {
        for n in 0..3 {
            let r = analyze_trend(&series(&vec![0.5; n]));
            assert_eq!(r.direction, TrendDirection::InsufficientData);
            assert_eq!(r.sample_count, n);
            assert_eq!(r.confidence, 0.0);
        }
    }

    #[test]
    fn linear_increase_is_improving() {
        let values: Vec<f64> = (1..=10).map(|i| i as f64 / 10.0).collect();
        let r = analyze_trend(&series(&values));
        assert_eq!(r.direction, TrendDirection::Improving);
        assert!((r.r_squared - 1.0).abs() < 1e-9);
        assert!((r.change - 0.9).abs() < 1e-9);
        assert!((r.confidence - 1.0).abs() < 1e-9);
        assert_eq!(r.sample_count, 10);
    }

    #[test]
    fn declining_and_input_order_does_not_matter() {
        let mut s = series(&[0.8, 0.5, 0.2, -0.1]);
        s.reverse();
        let r = analyze_trend(&s);
        assert_eq!(r.direction, TrendDirection::Declining);
        assert!((r.change + 0.9).abs() < 1e-9);
        assert!((r.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn flat_series_is_stable() {
        let r = analyze_trend(&series(&[0.25; 6]));
        assert_eq!(r.direction, TrendDirection::Stable);
        assert_eq!(r.strength, 0.0);
        assert_eq!(r.r_squared, 0.0);
    }

    #[test]
    fn identical_timestamps_are_an_error() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let s = vec![
            SentimentSample::new(t, 0.1, 0.9),
            SentimentSample::new(t, 0.5, 0.9),
            SentimentSample::new(t, -0.2, 0.9),
        ];
        let r = analyze_trend(&s);
        assert_eq!(r.direction, TrendDirection::Error);
        assert_eq!(r.strength, 0.0);
        assert_eq!(r.change, 0.0);
    }
}

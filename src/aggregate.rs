// src/aggregate.rs
//! Weighted blend of per-model results into one score per text.
//!
//! Only models present in the result slice count toward the total weight; a
//! configured model that produced nothing is neither numerator nor
//! denominator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::SentimentConfig;
use crate::sentiment::ModelSentimentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSentiment {
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub confidence: f64,
    pub label: SentimentLabel,
    pub high_confidence: bool,
    pub contributing_models: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregator {
    pub confidence_threshold: f64,
    pub positive_label_threshold: f64,
    pub negative_label_threshold: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::from_config(&SentimentConfig::default())
    }
}

impl Aggregator {
    pub fn from_config(cfg: &SentimentConfig) -> Self {
        Self {
            confidence_threshold: cfg.confidence_threshold,
            positive_label_threshold: cfg.positive_label_threshold,
            negative_label_threshold: cfg.negative_label_threshold,
        }
    }

    pub fn label_for(&self, compound: f64) -> SentimentLabel {
        if compound >= self.positive_label_threshold {
            SentimentLabel::Positive
        } else if compound <= self.negative_label_threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// `None` only for an empty slice. Unmapped models weigh 1.0, negative
    /// weights count as 0, and an all-zero total falls back to equal weights.
    pub fn aggregate(
        &self,
        results: &[ModelSentimentResult],
        weights: &BTreeMap<String, f64>,
    ) -> Option<AggregatedSentiment> {
        if results.is_empty() {
            return None;
        }

        // Fixed fold order makes the float sums independent of input order.
        let mut ordered: Vec<&ModelSentimentResult> = results.iter().collect();
        ordered.sort_by(|a, b| canonical_key(a).cmp(&canonical_key(b)));

        let mut resolved: Vec<f64> = ordered
            .iter()
            .map(|r| resolve_weight(weights, &r.model_id))
            .collect();
        let mut total: f64 = resolved.iter().sum();
        if total <= 0.0 {
            resolved.iter_mut().for_each(|w| *w = 1.0);
            total = resolved.len() as f64;
        }

        let mut acc = [0.0f64; 5];
        for (r, w) in ordered.iter().zip(&resolved) {
            acc[0] += r.compound * w;
            acc[1] += r.positive * w;
            acc[2] += r.negative * w;
            acc[3] += r.neutral * w;
            acc[4] += r.confidence * w;
        }
        let [compound, positive, negative, neutral, confidence] =
            acc.map(|v| guard(v / total));

        let compound = compound.clamp(-1.0, 1.0);
        let confidence = confidence.clamp(0.0, 1.0);

        Some(AggregatedSentiment {
            compound,
            positive: positive.clamp(0.0, 1.0),
            negative: negative.clamp(0.0, 1.0),
            neutral: neutral.clamp(0.0, 1.0),
            confidence,
            label: self.label_for(compound),
            high_confidence: confidence >= self.confidence_threshold,
            contributing_models: ordered.iter().map(|r| r.model_id.clone()).collect(),
        })
    }
}

fn resolve_weight(weights: &BTreeMap<String, f64>, model_id: &str) -> f64 {
    let w = weights.get(model_id).copied().unwrap_or(1.0);
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

fn canonical_key(r: &ModelSentimentResult) -> (&str, [u64; 5]) {
    (
        r.model_id.as_str(),
        [
            r.compound.to_bits(),
            r.positive.to_bits(),
            r.negative.to_bits(),
            r.neutral.to_bits(),
            r.confidence.to_bits(),
        ],
    )
}

fn guard(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, compound: f64, confidence: f64) -> ModelSentimentResult {
        ModelSentimentResult {
            model_id: id.to_string(),
            model_version: "t".to_string(),
            compound,
            positive: compound.max(0.0),
            negative: (-compound).max(0.0),
            neutral: 1.0 - compound.abs(),
            confidence,
            processing_time: 0.0,
            raw: serde_json::Value::Null,
        }
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn empty_is_none() {
        assert!(Aggregator::default().aggregate(&[], &BTreeMap::new()).is_none());
    }

    #[test]
    fn weighted_mean_over_present_models() {
        let agg = Aggregator::default();
        let out = agg
            .aggregate(
                &[result("a", 0.5, 0.5), result("b", -0.5, 1.0)],
                &weights(&[("a", 0.75), ("b", 0.25)]),
            )
            .unwrap();
        assert!((out.compound - 0.25).abs() < 1e-12);
        assert!((out.confidence - 0.625).abs() < 1e-12);
        assert_eq!(out.label, SentimentLabel::Positive);
        assert!(!out.high_confidence);
        assert_eq!(
            out.contributing_models.iter().cloned().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn absent_model_is_not_counted() {
        let agg = Aggregator::default();
        let out = agg
            .aggregate(&[result("b", 0.8, 0.9)], &weights(&[("a", 0.4), ("b", 0.6)]))
            .unwrap();
        assert!((out.confidence - 0.9).abs() < 1e-12);
        assert!((out.compound - 0.8).abs() < 1e-12);
        assert!(out.high_confidence);
    }

    #[test]
    fn unmapped_defaults_to_one_and_zero_total_is_equal_weights() {
        let agg = Aggregator::default();
        let out = agg
            .aggregate(
                &[result("x", 1.0, 1.0), result("y", 0.0, 0.0)],
                &weights(&[("y", 1.0)]),
            )
            .unwrap();
        assert!((out.compound - 0.5).abs() < 1e-12);

        let zero = agg
            .aggregate(
                &[result("x", 1.0, 1.0), result("y", 0.0, 0.0)],
                &weights(&[("x", 0.0), ("y", -3.0)]),
            )
            .unwrap();
        assert!((zero.compound - 0.5).abs() < 1e-12);
    }

    #[test]
    fn label_boundaries() {
        let agg = Aggregator::default();
        assert_eq!(agg.label_for(0.05), SentimentLabel::Positive);
        assert_eq!(agg.label_for(0.049999), SentimentLabel::Neutral);
        assert_eq!(agg.label_for(-0.05), SentimentLabel::Negative);
        assert_eq!(agg.label_for(-0.049999), SentimentLabel::Neutral);
    }

    #[test]
    fn high_confidence_is_inclusive() {
        let agg = Aggregator::default();
        let out = agg.aggregate(&[result("a", 0.1, 0.7)], &BTreeMap::new()).unwrap();
        assert!(out.high_confidence);
    }

    #[test]
    fn serializes_label_snake_case() {
        let agg = Aggregator::default();
        let out = agg.aggregate(&[result("a", -0.3, 0.2)], &BTreeMap::new()).unwrap();
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["label"], "negative");
    }
}

// src/sentiment/mod.rs
//! Uniform adapter surface over heterogeneous sentiment backends.
//!
//! Every adapter returns a [`ModelSentimentResult`]; `analyze` never fails.
//! Scoring errors produce the fallback sentinel (neutral, zero confidence,
//! `raw.error` set) and an adapter that could not initialize reports
//! `available() == false` for its whole lifetime.

pub mod lexicon;
pub mod neural;

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;

pub use lexicon::LexiconModel;
pub use neural::{ClassifierBackend, HttpClassifier, LabelScore, NeuralModel};

/// Output of one model for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSentimentResult {
    pub model_id: String,
    pub model_version: String,
    /// In [-1, 1].
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    /// In [0, 1].
    pub confidence: f64,
    /// Seconds spent scoring.
    pub processing_time: f64,
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl ModelSentimentResult {
    /// The "no information" sentinel.
    pub fn fallback(
        model_id: impl Into<String>,
        model_version: impl Into<String>,
        error: impl Display,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            model_version: model_version.into(),
            compound: 0.0,
            positive: 0.0,
            negative: 0.0,
            neutral: 1.0,
            confidence: 0.0,
            processing_time: 0.0,
            raw: serde_json::json!({ "error": error.to_string() }),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.raw.get("error").is_some()
    }

    /// Copy with every field forced into its declared bound (NaN → neutral).
    pub fn clamped(mut self) -> Self {
        self.compound = finite_or(self.compound, 0.0).clamp(-1.0, 1.0);
        self.positive = finite_or(self.positive, 0.0).clamp(0.0, 1.0);
        self.negative = finite_or(self.negative, 0.0).clamp(0.0, 1.0);
        self.neutral = finite_or(self.neutral, 1.0).clamp(0.0, 1.0);
        self.confidence = finite_or(self.confidence, 0.0).clamp(0.0, 1.0);
        self.processing_time = finite_or(self.processing_time, 0.0).max(0.0);
        self
    }
}

fn finite_or(x: f64, default: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        default
    }
}

/// Capability contract every scoring backend implements.
#[async_trait::async_trait]
pub trait SentimentModel: Send + Sync {
    fn id(&self) -> &str;

    fn version(&self) -> &str {
        "unknown"
    }

    /// Fixed at construction.
    fn available(&self) -> bool;

    /// Never fails; see [`ModelSentimentResult::fallback`].
    async fn analyze(&self, text: &str) -> ModelSentimentResult;
}

pub type DynModel = Arc<dyn SentimentModel>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_neutral_and_tagged() {
        let r = ModelSentimentResult::fallback("neural", "v1", "boom");
        assert_eq!(r.compound, 0.0);
        assert_eq!(r.neutral, 1.0);
        assert_eq!(r.confidence, 0.0);
        assert!(r.is_fallback());
        assert_eq!(r.raw["error"], "boom");
    }

    #[test]
    fn clamped_forces_bounds() {
        let r = ModelSentimentResult {
            model_id: "x".into(),
            model_version: "1".into(),
            compound: 3.0,
            positive: -0.2,
            negative: f64::NAN,
            neutral: 1.4,
            confidence: f64::INFINITY,
            processing_time: -1.0,
            raw: serde_json::Value::Null,
        }
        .clamped();
        assert_eq!(r.compound, 1.0);
        assert_eq!(r.positive, 0.0);
        assert_eq!(r.negative, 0.0);
        assert_eq!(r.neutral, 1.0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.processing_time, 0.0);
        assert!(!r.is_fallback());
    }
}

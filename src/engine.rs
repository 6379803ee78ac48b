// src/engine.rs
//! # Scoring engine
//! normalize → fan out to every available model (each under a timeout) →
//! aggregate. Holds only read-only state, so one instance is shared across
//! requests and topics behind an `Arc`.
//!
//! Fallback results (errors, timeouts) are dropped before aggregation unless
//! every model fell back, in which case the neutral sentinel is aggregated.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::aggregate::{AggregatedSentiment, Aggregator};
use crate::config::{EngineConfig, TextProcessingConfig, LEXICON_MODEL_ID, NEURAL_MODEL_ID};
use crate::metrics::{ensure_described, MODEL_FALLBACK_TOTAL, MODEL_LATENCY_MS, TEXTS_SCORED_TOTAL};
use crate::normalize::normalize_text;
use crate::sentiment::{DynModel, LexiconModel, ModelSentimentResult, NeuralModel};

/// One input text. Without an `id` the engine derives one from the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
}

impl TextRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredText {
    pub id: String,
    pub normalized: String,
    /// `None` for text that normalizes to nothing or when no model is available.
    pub sentiment: Option<AggregatedSentiment>,
    pub model_results: Vec<ModelSentimentResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Scored(ScoredText),
    Cancelled { id: String },
}

impl BatchEntry {
    pub fn id(&self) -> &str {
        match self {
            BatchEntry::Scored(s) => &s.id,
            BatchEntry::Cancelled { id } => id,
        }
    }
}

/// Stops a running batch from starting further texts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub version: String,
    pub available: bool,
    pub weight: f64,
}

pub struct SentimentEngine {
    text_cfg: TextProcessingConfig,
    aggregator: Aggregator,
    weights: BTreeMap<String, f64>,
    models: Vec<DynModel>,
    adapter_timeout: Duration,
    max_concurrency: usize,
}

impl SentimentEngine {
    /// Build the built-in adapters that are enabled in `cfg`.
    pub async fn from_config(cfg: &EngineConfig) -> Self {
        let mut models: Vec<DynModel> = Vec::new();
        if cfg.sentiment.is_enabled(LEXICON_MODEL_ID) {
            models.push(Arc::new(LexiconModel::new()));
        }
        if cfg.sentiment.is_enabled(NEURAL_MODEL_ID) {
            models.push(Arc::new(NeuralModel::from_config(&cfg.neural).await));
        }
        Self::with_models(cfg, models)
    }

    /// Use caller-supplied adapters (custom backends, tests).
    pub fn with_models(cfg: &EngineConfig, models: Vec<DynModel>) -> Self {
        ensure_described();
        for m in &models {
            if !m.available() {
                warn!(target: "engine", model = m.id(), "model unavailable; excluded from scoring");
            }
        }
        let available = models.iter().filter(|m| m.available()).count();
        info!(target: "engine", models = models.len(), available, "sentiment engine ready");
        Self {
            text_cfg: cfg.text_processing.clone(),
            aggregator: Aggregator::from_config(&cfg.sentiment),
            weights: cfg.sentiment.weights(),
            models,
            adapter_timeout: Duration::from_millis(cfg.performance.adapter_timeout_ms),
            max_concurrency: cfg.performance.max_concurrency.max(1),
        }
    }

    pub fn model_info(&self) -> Vec<ModelInfo> {
        self.models
            .iter()
            .map(|m| ModelInfo {
                id: m.id().to_string(),
                version: m.version().to_string(),
                available: m.available(),
                weight: self.weights.get(m.id()).copied().unwrap_or(1.0),
            })
            .collect()
    }

    pub fn has_available_model(&self) -> bool {
        self.models.iter().any(|m| m.available())
    }

    /// Aggregated score only.
    pub async fn score_text(&self, text: &str) -> Option<AggregatedSentiment> {
        self.analyze(TextRecord::new(text)).await.sentiment
    }

    pub async fn analyze(&self, record: TextRecord) -> ScoredText {
        let id = record.id.unwrap_or_else(|| text_id(&record.text));
        self.score_record(id, &record.text).await
    }

    /// Texts run concurrently up to `max_concurrency`; output keeps input
    /// order. Once `cancel` is set, texts not yet started come back as
    /// [`BatchEntry::Cancelled`].
    pub async fn score_batch(&self, records: Vec<TextRecord>, cancel: &CancelFlag) -> Vec<BatchEntry> {
        let jobs = records.into_iter().map(|rec| async move {
            let id = rec.id.unwrap_or_else(|| text_id(&rec.text));
            if cancel.is_cancelled() {
                return BatchEntry::Cancelled { id };
            }
            BatchEntry::Scored(self.score_record(id, &rec.text).await)
        });
        let out: Vec<BatchEntry> = stream::iter(jobs).buffered(self.max_concurrency).collect().await;
        let cancelled = out
            .iter()
            .filter(|e| matches!(e, BatchEntry::Cancelled { .. }))
            .count();
        if cancelled > 0 {
            info!(target: "engine", total = out.len(), cancelled, "batch cancelled");
        }
        out
    }

    async fn score_record(&self, id: String, text: &str) -> ScoredText {
        let normalized = normalize_text(text, &self.text_cfg);
        if normalized.is_empty() {
            return ScoredText {
                id,
                normalized,
                sentiment: None,
                model_results: Vec::new(),
            };
        }

        let runs = self
            .models
            .iter()
            .filter(|m| m.available())
            .map(|m| self.run_model(m, &normalized));
        let model_results: Vec<ModelSentimentResult> = join_all(runs).await;

        let usable: Vec<ModelSentimentResult> = if model_results.iter().all(|r| r.is_fallback()) {
            model_results.clone()
        } else {
            model_results.iter().filter(|r| !r.is_fallback()).cloned().collect()
        };
        let sentiment = self.aggregator.aggregate(&usable, &self.weights);
        if sentiment.is_some() {
            counter!(TEXTS_SCORED_TOTAL).increment(1);
        }
        debug!(target: "engine", id = %id, models = model_results.len(), "text scored");

        ScoredText {
            id,
            normalized,
            sentiment,
            model_results,
        }
    }

    async fn run_model(&self, model: &DynModel, text: &str) -> ModelSentimentResult {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.adapter_timeout, model.analyze(text)).await {
            Ok(r) => r,
            Err(_) => {
                warn!(target: "engine", model = model.id(), timeout_ms = self.adapter_timeout.as_millis() as u64, "model timed out");
                ModelSentimentResult::fallback(
                    model.id(),
                    model.version(),
                    format!("timed out after {}ms", self.adapter_timeout.as_millis()),
                )
            }
        };
        let model_id = model.id().to_string();
        histogram!(MODEL_LATENCY_MS, "model" => model_id.clone())
            .record(started.elapsed().as_secs_f64() * 1000.0);
        if result.is_fallback() {
            counter!(MODEL_FALLBACK_TOTAL, "model" => model_id).increment(1);
        }
        result
    }
}

/// Short stable id for texts submitted without one.
pub fn text_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// src/sentiment/neural.rs
//! Transformer-style classifier adapter.
//!
//! The actual model sits behind [`ClassifierBackend`]; production uses an
//! HTTP inference endpoint ([`HttpClassifier`]), tests plug in stubs.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{ModelSentimentResult, SentimentModel};
use crate::config::{NeuralConfig, NEURAL_MODEL_ID};

/// Positions the backend tokenizer spends on special tokens.
const RESERVED_TOKENS: usize = 2;

/// One `(label, probability)` pair as emitted by a classifier head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

#[async_trait::async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Reported as the model version.
    fn name(&self) -> &str;

    /// Called once when the adapter is built. An error disables the adapter.
    async fn probe(&self) -> anyhow::Result<()>;

    async fn classify(&self, text: &str) -> anyhow::Result<Vec<LabelScore>>;
}

pub type DynBackend = Arc<dyn ClassifierBackend>;

pub struct NeuralModel {
    backend: Option<DynBackend>,
    version: String,
    max_tokens: usize,
}

impl NeuralModel {
    /// Probe the backend once; failure leaves the model unavailable for good.
    pub async fn initialize(backend: DynBackend, max_tokens: usize) -> Self {
        let version = backend.name().to_string();
        match backend.probe().await {
            Ok(()) => {
                info!(target: "engine", backend = %version, max_tokens, "neural model ready");
                Self {
                    backend: Some(backend),
                    version,
                    max_tokens,
                }
            }
            Err(e) => {
                warn!(target: "engine", backend = %version, error = %e, "neural backend probe failed; model unavailable");
                Self {
                    backend: None,
                    version,
                    max_tokens,
                }
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        warn!(target: "engine", reason, "neural model unavailable");
        Self {
            backend: None,
            version: "unavailable".to_string(),
            max_tokens: NeuralConfig::default().max_tokens,
        }
    }

    /// Build from `[neural]`. No endpoint or a broken client → unavailable.
    pub async fn from_config(cfg: &NeuralConfig) -> Self {
        let Some(endpoint) = cfg.endpoint.as_deref() else {
            return Self::unavailable("no [neural].endpoint configured");
        };
        let token = std::env::var(&cfg.api_token_env).ok().filter(|t| !t.is_empty());
        match HttpClassifier::new(
            endpoint,
            token,
            Duration::from_millis(cfg.request_timeout_ms),
        ) {
            Ok(client) => Self::initialize(Arc::new(client), cfg.max_tokens).await,
            Err(e) => Self::unavailable(&format!("{e:#}")),
        }
    }

    fn fallback(&self, error: impl std::fmt::Display) -> ModelSentimentResult {
        ModelSentimentResult::fallback(NEURAL_MODEL_ID, self.version.clone(), error)
    }
}

#[async_trait::async_trait]
impl SentimentModel for NeuralModel {
    fn id(&self) -> &str {
        NEURAL_MODEL_ID
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn available(&self) -> bool {
        self.backend.is_some()
    }

    async fn analyze(&self, text: &str) -> ModelSentimentResult {
        let Some(backend) = &self.backend else {
            return self.fallback("model unavailable");
        };
        let started = Instant::now();
        let input = truncate_tokens(text, self.max_tokens.saturating_sub(RESERVED_TOKENS));

        let scores = match backend.classify(&input).await {
            Ok(s) => s,
            Err(e) => {
                debug!(target: "engine", error = %e, "neural classify failed");
                return self.fallback(e);
            }
        };
        let Some(probs) = LabelProbs::from_scores(&scores) else {
            return self.fallback(format!("unrecognised labels: {scores:?}"));
        };

        ModelSentimentResult {
            model_id: NEURAL_MODEL_ID.to_string(),
            model_version: self.version.clone(),
            compound: probs.positive - probs.negative,
            positive: probs.positive,
            negative: probs.negative,
            neutral: probs.neutral,
            confidence: probs.positive.max(probs.negative).max(probs.neutral),
            processing_time: started.elapsed().as_secs_f64(),
            raw: json!({ "labels": scores }),
        }
        .clamped()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct LabelProbs {
    positive: f64,
    negative: f64,
    neutral: f64,
}

impl LabelProbs {
    /// `None` unless at least one known label is present.
    fn from_scores(scores: &[LabelScore]) -> Option<Self> {
        let mut out = LabelProbs::default();
        let mut seen = false;
        for s in scores {
            let slot = match s.label.to_lowercase().as_str() {
                "positive" | "pos" | "label_2" => &mut out.positive,
                "negative" | "neg" | "label_0" => &mut out.negative,
                "neutral" | "neu" | "label_1" => &mut out.neutral,
                _ => continue,
            };
            *slot = s.score;
            seen = true;
        }
        seen.then_some(out)
    }
}

/// Keep at most `limit` whitespace tokens.
pub(crate) fn truncate_tokens(text: &str, limit: usize) -> String {
    text.split_whitespace().take(limit).collect::<Vec<_>>().join(" ")
}

/// Hugging Face style inference endpoint: `POST {"inputs": text}`.
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl HttpClassifier {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("topic-sentiment-monitor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building inference http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            token,
        })
    }
}

#[async_trait::async_trait]
impl ClassifierBackend for HttpClassifier {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn probe(&self) -> anyhow::Result<()> {
        let scores = self.classify("ok").await.context("probe request")?;
        LabelProbs::from_scores(&scores)
            .map(|_| ())
            .ok_or_else(|| anyhow!("probe returned no sentiment labels"))
    }

    async fn classify(&self, text: &str) -> anyhow::Result<Vec<LabelScore>> {
        let mut req = self.http.post(&self.endpoint).json(&json!({ "inputs": text }));
        if let Some(t) = &self.token {
            req = req.bearer_auth(t);
        }
        let resp = req.send().await.context("inference request")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("inference endpoint returned {status}"));
        }
        let body: InferenceResponse = resp.json().await.context("decoding inference response")?;
        Ok(match body {
            InferenceResponse::Nested(mut v) => {
                if v.is_empty() {
                    Vec::new()
                } else {
                    v.swap_remove(0)
                }
            }
            InferenceResponse::Flat(v) => v,
        })
    }
}

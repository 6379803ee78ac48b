// src/sentiment/lexicon.rs
//! Dictionary scorer: no network, no warm-up, always answers.

use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use super::{ModelSentimentResult, SentimentModel};
use crate::config::LEXICON_MODEL_ID;

const MODEL_VERSION: &str = "lexicon-1";

/// Normalization constant of the compound score (VADER's alpha).
const ALPHA: f64 = 15.0;
const BOOSTER_INCR: f64 = 0.293;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCR: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

type Lexicon = HashMap<String, f64>;

static EMBEDDED: Lazy<Result<Arc<Lexicon>, String>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    parse_lexicon(raw).map(Arc::new)
});

fn parse_lexicon(raw: &str) -> Result<Lexicon, String> {
    serde_json::from_str::<Lexicon>(raw).map_err(|e| e.to_string())
}

/// Raw lexicon scores before they are wrapped into a result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexiconScores {
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Rule-based scorer over a valence lexicon (VADER-style).
#[derive(Debug, Clone)]
pub struct LexiconModel {
    lexicon: Option<Arc<Lexicon>>,
}

impl Default for LexiconModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconModel {
    /// Uses the embedded lexicon.
    pub fn new() -> Self {
        match &*EMBEDDED {
            Ok(lex) => Self {
                lexicon: Some(lex.clone()),
            },
            Err(e) => {
                warn!(target: "engine", error = %e, "embedded lexicon unreadable; lexicon model unavailable");
                Self { lexicon: None }
            }
        }
    }

    /// Custom lexicon as a JSON object `{ "word": valence }`. Unparseable
    /// input leaves the model permanently unavailable.
    pub fn from_json(raw: &str) -> Self {
        match parse_lexicon(raw) {
            Ok(lex) => Self {
                lexicon: Some(Arc::new(lex)),
            },
            Err(e) => {
                warn!(target: "engine", error = %e, "custom lexicon unreadable; lexicon model unavailable");
                Self { lexicon: None }
            }
        }
    }

    /// Lexicon valence of a single token (0 if unknown).
    #[inline]
    fn word_score(lex: &Lexicon, w: &str) -> f64 {
        lex.get(w).copied().unwrap_or(0.0)
    }

    /// Negation: a negator within the 3 preceding tokens flips and damps the
    /// valence. Boosters/dampeners directly before a word shift its magnitude.
    pub fn score_text(&self, text: &str) -> Option<LexiconScores> {
        let lex = self.lexicon.as_deref()?;
        let tokens: Vec<String> = tokenize(text).collect();

        let mut valences: Vec<f64> = Vec::new();
        let mut neutral_count = 0usize;

        for i in 0..tokens.len() {
            let w = tokens[i].as_str();
            let base = Self::word_score(lex, w);
            if base == 0.0 {
                if !is_booster(w) && !is_dampener(w) {
                    neutral_count += 1;
                }
                continue;
            }

            let mut v = base;
            if i >= 1 {
                let prev = tokens[i - 1].as_str();
                if is_booster(prev) {
                    v += BOOSTER_INCR * v.signum();
                } else if is_dampener(prev) {
                    v -= BOOSTER_INCR * v.signum();
                }
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            if negated {
                v *= NEGATION_SCALAR;
            }
            valences.push(v);
        }

        let mut sum: f64 = valences.iter().sum();
        let emphasis = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64 * EXCLAMATION_INCR;
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }

        let compound = if sum == 0.0 {
            0.0
        } else {
            (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
        };

        // Polarity mass per token, shifted by one so weak words still count.
        let mut pos_sum: f64 = valences.iter().filter(|v| **v > 0.0).map(|v| v + 1.0).sum();
        let mut neg_sum: f64 = valences.iter().filter(|v| **v < 0.0).map(|v| v - 1.0).sum();
        if pos_sum > neg_sum.abs() {
            pos_sum += emphasis;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= emphasis;
        }
        let total = pos_sum + neg_sum.abs() + neutral_count as f64;

        let (positive, negative, neutral) = if total > 0.0 {
            (pos_sum / total, neg_sum.abs() / total, neutral_count as f64 / total)
        } else {
            (0.0, 0.0, 1.0)
        };

        Some(LexiconScores {
            compound,
            positive,
            negative,
            neutral,
        })
    }
}

#[async_trait::async_trait]
impl SentimentModel for LexiconModel {
    fn id(&self) -> &str {
        LEXICON_MODEL_ID
    }

    fn version(&self) -> &str {
        MODEL_VERSION
    }

    fn available(&self) -> bool {
        self.lexicon.is_some()
    }

    async fn analyze(&self, text: &str) -> ModelSentimentResult {
        let started = Instant::now();
        let Some(s) = self.score_text(text) else {
            return ModelSentimentResult::fallback(LEXICON_MODEL_ID, MODEL_VERSION, "lexicon not loaded");
        };
        ModelSentimentResult {
            model_id: LEXICON_MODEL_ID.to_string(),
            model_version: MODEL_VERSION.to_string(),
            compound: s.compound,
            positive: s.positive,
            negative: s.negative,
            neutral: s.neutral,
            // Confidence is the magnitude of the compound score.
            confidence: s.compound.abs(),
            processing_time: started.elapsed().as_secs_f64(),
            raw: json!({
                "compound": s.compound,
                "pos": s.positive,
                "neg": s.negative,
                "neu": s.neutral,
            }),
        }
        .clamped()
    }
}

/// Whitespace tokens, lower-case, surrounding punctuation stripped
/// (inner apostrophes survive so "isn't" stays one token).
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "none"
            | "nobody"
            | "nothing"
            | "neither"
            | "nowhere"
            | "isn't"
            | "aren't"
            | "wasn't"
            | "weren't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "won't"
            | "wouldn't"
            | "can't"
            | "cannot"
            | "couldn't"
            | "shouldn't"
            | "without"
    )
}

fn is_booster(tok: &str) -> bool {
    matches!(
        tok,
        "very"
            | "really"
            | "extremely"
            | "incredibly"
            | "absolutely"
            | "totally"
            | "completely"
            | "utterly"
            | "so"
            | "super"
            | "highly"
    )
}

fn is_dampener(tok: &str) -> bool {
    matches!(
        tok,
        "slightly" | "barely" | "hardly" | "scarcely" | "somewhat" | "kinda" | "sorta"
    )
}

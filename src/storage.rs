// src/storage.rs
//! Persistence seam. The analytics layer only reads ordered samples and window
//! summaries; whatever backs them (database, cache) lives behind
//! [`SentimentStore`]. [`InMemoryStore`] serves the HTTP app and tests.

use anyhow::anyhow;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::aggregate::AggregatedSentiment;
use crate::analytics::SentimentSample;

/// Compound scores strictly beyond ±0.1 count as positive / negative.
pub const SUMMARY_LABEL_BAND: f64 = 0.1;

/// One aggregated score attached to a topic, keyed by source-text id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSentiment {
    pub id: String,
    pub topic: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment: AggregatedSentiment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub post_count: u64,
    pub avg_sentiment: f64,
    pub avg_confidence: f64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub neutral_count: u64,
}

impl WindowSummary {
    /// Summary over raw `(compound, confidence)` pairs.
    pub fn from_scores(scores: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut out = WindowSummary::default();
        let (mut sum_s, mut sum_c) = (0.0, 0.0);
        for (s, c) in scores {
            out.post_count += 1;
            sum_s += s;
            sum_c += c;
            if s > SUMMARY_LABEL_BAND {
                out.positive_count += 1;
            } else if s < -SUMMARY_LABEL_BAND {
                out.negative_count += 1;
            } else {
                out.neutral_count += 1;
            }
        }
        if out.post_count > 0 {
            out.avg_sentiment = sum_s / out.post_count as f64;
            out.avg_confidence = sum_c / out.post_count as f64;
        }
        out
    }

    pub fn positive_ratio(&self) -> f64 {
        self.positive_count as f64 / self.post_count.max(1) as f64
    }

    pub fn negative_ratio(&self) -> f64 {
        self.negative_count as f64 / self.post_count.max(1) as f64
    }
}

#[async_trait::async_trait]
pub trait SentimentStore: Send + Sync {
    /// Samples at or after `since` with confidence ≥ `min_confidence`,
    /// ascending by timestamp.
    async fn fetch_samples(
        &self,
        topic: &str,
        since: DateTime<Utc>,
        min_confidence: f64,
    ) -> anyhow::Result<Vec<SentimentSample>>;

    /// Every record at or after `since`, regardless of confidence.
    async fn fetch_summary(&self, topic: &str, since: DateTime<Utc>) -> anyhow::Result<WindowSummary>;

    /// Insert or replace by `record.id`.
    async fn persist(&self, record: StoredSentiment) -> anyhow::Result<()>;

    /// Drop every record older than `before`; returns how many went.
    async fn prune(&self, before: DateTime<Utc>) -> anyhow::Result<usize>;
}

pub type DynStore = Arc<dyn SentimentStore>;

/// Minimum spacing between retention sweeps triggered by `persist`.
const SWEEP_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, StoredSentiment>>,
    retention: Option<TimeDelta>,
    last_sweep: Mutex<Option<DateTime<Utc>>>,
}

impl InMemoryStore {
    /// Keeps everything until pruned explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweeps records older than `hours` (wall clock) while persisting.
    /// `0` keeps everything.
    pub fn with_retention(hours: u32) -> Self {
        Self {
            retention: (hours > 0).then(|| TimeDelta::hours(i64::from(hours))),
            ..Self::default()
        }
    }

    fn prune_before(&self, before: DateTime<Utc>) -> anyhow::Result<usize> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let n = guard.len();
        guard.retain(|_, r| r.timestamp >= before);
        Ok(n - guard.len())
    }

    fn sweep_due(&self, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let mut last = self
            .last_sweep
            .lock()
            .map_err(|_| anyhow!("in-memory store sweep lock poisoned"))?;
        let due = last.map_or(true, |t| now - t >= TimeDelta::seconds(SWEEP_INTERVAL_SECS));
        if due {
            *last = Some(now);
        }
        Ok(due)
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn in_window(
        &self,
        topic: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<StoredSentiment>> {
        let guard = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let mut v: Vec<StoredSentiment> = guard
            .values()
            .filter(|r| r.topic == topic && r.timestamp >= since)
            .cloned()
            .collect();
        v.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(v)
    }
}

#[async_trait::async_trait]
impl SentimentStore for InMemoryStore {
    async fn fetch_samples(
        &self,
        topic: &str,
        since: DateTime<Utc>,
        min_confidence: f64,
    ) -> anyhow::Result<Vec<SentimentSample>> {
        Ok(self
            .in_window(topic, since)?
            .into_iter()
            .filter(|r| r.sentiment.confidence >= min_confidence)
            .map(|r| SentimentSample::new(r.timestamp, r.sentiment.compound, r.sentiment.confidence))
            .collect())
    }

    async fn fetch_summary(&self, topic: &str, since: DateTime<Utc>) -> anyhow::Result<WindowSummary> {
        let rows = self.in_window(topic, since)?;
        Ok(WindowSummary::from_scores(
            rows.iter().map(|r| (r.sentiment.compound, r.sentiment.confidence)),
        ))
    }

    async fn persist(&self, record: StoredSentiment) -> anyhow::Result<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        guard.insert(record.id.clone(), record);
        drop(guard);

        if let Some(retention) = self.retention {
            let now = Utc::now();
            if self.sweep_due(now)? {
                let dropped = self.prune_before(now - retention)?;
                if dropped > 0 {
                    debug!(target: "analytics", dropped, "expired scores pruned");
                }
            }
        }
        Ok(())
    }

    async fn prune(&self, before: DateTime<Utc>) -> anyhow::Result<usize> {
        self.prune_before(before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SentimentLabel;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn rec(id: &str, topic: &str, ts: DateTime<Utc>, compound: f64, confidence: f64) -> StoredSentiment {
        StoredSentiment {
            id: id.to_string(),
            topic: topic.to_string(),
            timestamp: ts,
            sentiment: AggregatedSentiment {
                compound,
                positive: compound.max(0.0),
                negative: (-compound).max(0.0),
                neutral: 1.0 - compound.abs(),
                confidence,
                label: SentimentLabel::Neutral,
                high_confidence: false,
                contributing_models: BTreeSet::new(),
            },
        }
    }

    #[test]
    fn summary_bands_are_exclusive_at_point_one() {
        let s = WindowSummary::from_scores([(0.1, 1.0), (0.11, 1.0), (-0.1, 0.5), (-0.5, 0.5)]);
        assert_eq!(s.post_count, 4);
        assert_eq!(s.positive_count, 1);
        assert_eq!(s.negative_count, 1);
        assert_eq!(s.neutral_count, 2);
        assert!((s.avg_confidence - 0.75).abs() < 1e-12);
        assert_eq!(WindowSummary::from_scores(std::iter::empty()), WindowSummary::default());
    }

    #[tokio::test]
    async fn samples_are_filtered_and_ordered() {
        let store = InMemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.persist(rec("c", "rust", t0 + Duration::hours(3), 0.3, 0.9)).await.unwrap();
        store.persist(rec("a", "rust", t0 + Duration::hours(1), 0.1, 0.9)).await.unwrap();
        store.persist(rec("b", "rust", t0 + Duration::hours(2), 0.2, 0.2)).await.unwrap();
        store.persist(rec("z", "go", t0 + Duration::hours(2), 0.9, 0.9)).await.unwrap();
        store.persist(rec("old", "rust", t0 - Duration::hours(5), 0.9, 0.9)).await.unwrap();

        let got = store.fetch_samples("rust", t0, 0.5).await.unwrap();
        let values: Vec<f64> = got.iter().map(|s| s.sentiment).collect();
        assert_eq!(values, vec![0.1, 0.3]);

        let summary = store.fetch_summary("rust", t0).await.unwrap();
        assert_eq!(summary.post_count, 3);
    }

    #[tokio::test]
    async fn prune_drops_expired_records() {
        let store = InMemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.persist(rec("old", "rust", t0 - Duration::hours(48), -0.9, 0.9)).await.unwrap();
        store.persist(rec("edge", "rust", t0, 0.2, 0.9)).await.unwrap();
        store.persist(rec("new", "rust", t0 + Duration::hours(1), 0.4, 0.9)).await.unwrap();

        assert_eq!(store.prune(t0).await.unwrap(), 1);
        assert_eq!(store.len(), 2);
        let since = t0 - Duration::hours(100);
        let values: Vec<f64> = store
            .fetch_samples("rust", since, 0.0)
            .await
            .unwrap()
            .iter()
            .map(|s| s.sentiment)
            .collect();
        assert_eq!(values, vec![0.2, 0.4]);
        assert_eq!(store.fetch_summary("rust", since).await.unwrap().post_count, 2);
        assert_eq!(store.prune(t0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn retention_sweeps_on_persist() {
        let store = InMemoryStore::with_retention(24);
        let now = Utc::now();
        store.persist(rec("stale", "rust", now - Duration::hours(48), -0.9, 0.9)).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.fetch_summary("rust", now - Duration::hours(72)).await.unwrap().post_count, 0);

        store.persist(rec("fresh", "rust", now, 0.5, 0.9)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.fetch_samples("rust", now - Duration::hours(1), 0.0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_retention_keeps_everything() {
        let store = InMemoryStore::with_retention(0);
        let old = Utc::now() - Duration::days(3650);
        store.persist(rec("ancient", "rust", old, 0.1, 0.9)).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn persist_replaces_by_id() {
        let store = InMemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.persist(rec("a", "rust", t0, 0.1, 0.9)).await.unwrap();
        store.persist(rec("a", "rust", t0, -0.4, 0.9)).await.unwrap();
        assert_eq!(store.len(), 1);
        let s = store.fetch_samples("rust", t0, 0.0).await.unwrap();
        assert_eq!(s[0].sentiment, -0.4);
    }
}

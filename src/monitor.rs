// src/monitor.rs
//! Storage-backed analytics for one topic at a time.
//!
//! Each call takes `now` explicitly and reads one snapshot from the store, so
//! results are reproducible and concurrent calls for different topics share
//! nothing mutable.

use anyhow::anyhow;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::alerts::{evaluate_alerts, AlertCondition};
use crate::analytics::{
    analyze_trend, analyze_volume_correlation, calculate_momentum, detect_anomalies, AnomalyRecord,
    CorrelationResult, MomentumResult, Outcome, SentimentSample, TrendResult,
};
use crate::config::{AlertsConfig, AnalyticsConfig, EngineConfig};
use crate::insights::{compare_topics, compose_insight, Insight, InsightInputs, TopicComparison, TopicSnapshot};
use crate::storage::{DynStore, WindowSummary};

#[derive(Clone)]
pub struct TopicAnalytics {
    store: DynStore,
    analytics: AnalyticsConfig,
    alerts: AlertsConfig,
}

impl TopicAnalytics {
    pub fn new(store: DynStore, cfg: &EngineConfig) -> Self {
        Self {
            store,
            analytics: cfg.analytics.clone(),
            alerts: cfg.alerts.clone(),
        }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub fn default_window_hours(&self) -> u32 {
        self.analytics.default_window_hours
    }

    pub fn max_window_hours(&self) -> u32 {
        self.analytics.max_window_hours
    }

    fn since(now: DateTime<Utc>, hours: u32) -> anyhow::Result<DateTime<Utc>> {
        TimeDelta::try_hours(i64::from(hours))
            .and_then(|d| now.checked_sub_signed(d))
            .ok_or_else(|| anyhow!("a {hours}h window before {now} is outside the supported date range"))
    }

    async fn samples(&self, topic: &str, hours: u32, now: DateTime<Utc>) -> anyhow::Result<Vec<SentimentSample>> {
        let samples = self
            .store
            .fetch_samples(topic, Self::since(now, hours)?, self.analytics.min_sample_confidence)
            .await?;
        debug!(target: "analytics", topic, hours, samples = samples.len(), "samples fetched");
        Ok(samples)
    }

    pub async fn summary(&self, topic: &str, hours: u32, now: DateTime<Utc>) -> anyhow::Result<WindowSummary> {
        self.store.fetch_summary(topic, Self::since(now, hours)?).await
    }

    pub async fn analyze_trends(&self, topic: &str, hours: u32, now: DateTime<Utc>) -> anyhow::Result<TrendResult> {
        Ok(analyze_trend(&self.samples(topic, hours, now).await?))
    }

    pub async fn calculate_momentum(
        &self,
        topic: &str,
        hours: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Outcome<MomentumResult>> {
        Ok(calculate_momentum(&self.samples(topic, hours, now).await?))
    }

    pub async fn volume_correlation(
        &self,
        topic: &str,
        hours: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Outcome<CorrelationResult>> {
        Ok(analyze_volume_correlation(&self.samples(topic, hours, now).await?))
    }

    pub async fn detect_anomalies(
        &self,
        topic: &str,
        hours: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AnomalyRecord>> {
        Ok(detect_anomalies(&self.samples(topic, hours, now).await?))
    }

    /// Summary over `alert_summary_hours`, trend over `alert_trend_hours`.
    pub async fn check_alert_conditions(&self, topic: &str, now: DateTime<Utc>) -> anyhow::Result<Vec<AlertCondition>> {
        if !self.alerts.enabled {
            return Ok(Vec::new());
        }
        let summary = self.summary(topic, self.analytics.alert_summary_hours, now).await?;
        let trend = self
            .analyze_trends(topic, self.analytics.alert_trend_hours, now)
            .await?;
        let alerts = evaluate_alerts(&summary, &trend, &self.alerts);
        if !alerts.is_empty() {
            info!(target: "alerts", topic, count = alerts.len(), "alert conditions met");
        }
        Ok(alerts)
    }

    pub async fn generate_insights(&self, topic: &str, hours: u32, now: DateTime<Utc>) -> anyhow::Result<Insight> {
        let summary = self.summary(topic, hours, now).await?;
        let samples = self.samples(topic, hours, now).await?;
        let alerts = self.check_alert_conditions(topic, now).await?;

        let insight = compose_insight(
            topic,
            hours,
            now,
            InsightInputs {
                summary,
                trend: analyze_trend(&samples),
                momentum: calculate_momentum(&samples),
                correlation: analyze_volume_correlation(&samples),
                anomalies: detect_anomalies(&samples),
                alerts,
            },
        );
        info!(
            target: "analytics",
            topic,
            hours,
            posts = insight.summary.post_count,
            anomalies = insight.anomalies.len(),
            recommendations = insight.recommendations.len(),
            "insight generated"
        );
        Ok(insight)
    }

    /// Duplicate topics are compared once, first occurrence wins.
    pub async fn compare_topics(
        &self,
        topics: &[String],
        hours: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TopicComparison>> {
        let mut snapshots: Vec<TopicSnapshot> = Vec::with_capacity(topics.len());
        for topic in topics {
            if snapshots.iter().any(|s| &s.topic == topic) {
                continue;
            }
            let summary = self.summary(topic, hours, now).await?;
            let trend = self.analyze_trends(topic, hours, now).await?;
            snapshots.push(TopicSnapshot::new(topic, &summary, &trend));
        }
        Ok(compare_topics(snapshots))
    }
}

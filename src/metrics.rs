// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const TEXTS_SCORED_TOTAL: &str = "sentiment_texts_scored_total";
pub const MODEL_FALLBACK_TOTAL: &str = "sentiment_model_fallback_total";
pub const MODEL_LATENCY_MS: &str = "sentiment_model_latency_ms";
pub const ALERTS_EMITTED_TOTAL: &str = "sentiment_alerts_emitted_total";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(TEXTS_SCORED_TOTAL, "Texts that produced an aggregated score.");
        describe_counter!(
            MODEL_FALLBACK_TOTAL,
            "Per-model fallback results (errors, timeouts), labelled by model."
        );
        describe_histogram!(MODEL_LATENCY_MS, "Per-model scoring latency in milliseconds.");
        describe_counter!(
            ALERTS_EMITTED_TOTAL,
            "Alert conditions delivered to notifiers, labelled by kind."
        );
    });
}

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. A process holds one global recorder,
    /// so later calls hand back the same handle.
    pub fn init() -> anyhow::Result<Self> {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();
        ensure_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

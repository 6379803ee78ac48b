// src/notify/mod.rs
//! Alert delivery seam. Transport lives behind [`Notifier`]; the
//! [`AlertDispatcher`] decides what is new enough to deliver.

pub mod log;
pub mod recency;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::alerts::AlertCondition;
use crate::metrics::ALERTS_EMITTED_TOTAL;

pub use log::LogNotifier;
pub use recency::RecencyGate;

/// Default suppression window for a repeated (topic, kind).
pub const DEFAULT_RECENCY_SECS: i64 = 3_600;

/// One evaluation's worth of alerts for one topic, in evaluator order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub topic: String,
    pub alerts: Vec<AlertCondition>,
    pub ts: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, ev: &AlertEvent) -> Result<()>;
}

pub type DynNotifier = Arc<dyn Notifier>;

/// Fan-out over several notifiers; one failing channel does not stop the rest.
#[derive(Clone, Default)]
pub struct NotifierMux {
    notifiers: Vec<DynNotifier>,
}

impl NotifierMux {
    pub fn new(notifiers: Vec<DynNotifier>) -> Self {
        Self { notifiers }
    }

    pub fn with_log() -> Self {
        Self::new(vec![Arc::new(LogNotifier)])
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Number of notifiers that accepted the event.
    pub async fn notify(&self, ev: &AlertEvent) -> usize {
        let mut ok = 0;
        for n in &self.notifiers {
            match n.send(ev).await {
                Ok(()) => ok += 1,
                Err(e) => warn!(target: "notify", notifier = n.name(), error = %format!("{e:#}"), "notify failed"),
            }
        }
        ok
    }
}

/// Delivers alerts, suppressing a (topic, kind) already delivered within the
/// recency window.
pub struct AlertDispatcher {
    mux: NotifierMux,
    gate: Mutex<RecencyGate>,
}

impl AlertDispatcher {
    pub fn new(mux: NotifierMux, recency_secs: i64) -> Self {
        Self {
            mux,
            gate: Mutex::new(RecencyGate::new(recency_secs)),
        }
    }

    /// Returns the alerts that were handed to the notifiers.
    pub async fn dispatch(
        &self,
        topic: &str,
        alerts: &[AlertCondition],
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertCondition>> {
        let fresh: Vec<AlertCondition> = {
            let gate = self.gate.lock().map_err(|_| anyhow!("recency gate poisoned"))?;
            alerts
                .iter()
                .filter(|a| a.triggered && gate.should_alert(topic, a.kind, now))
                .cloned()
                .collect()
        };
        if fresh.is_empty() {
            debug!(target: "notify", topic, suppressed = alerts.len(), "nothing new to deliver");
            return Ok(fresh);
        }

        let ev = AlertEvent {
            topic: topic.to_string(),
            alerts: fresh.clone(),
            ts: now,
        };
        let delivered = self.mux.notify(&ev).await;
        if delivered > 0 || self.mux.is_empty() {
            let mut gate = self.gate.lock().map_err(|_| anyhow!("recency gate poisoned"))?;
            for a in &fresh {
                gate.record_alert(topic, a.kind, now);
                counter!(ALERTS_EMITTED_TOTAL, "kind" => a.kind.as_str()).increment(1);
            }
        }
        Ok(fresh)
    }
}

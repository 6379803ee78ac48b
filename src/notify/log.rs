// src/notify/log.rs
use anyhow::Result;
use tracing::warn;

use super::{AlertEvent, Notifier};

/// Writes each alert as a structured `warn` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, ev: &AlertEvent) -> Result<()> {
        for a in &ev.alerts {
            warn!(
                target: "notify",
                topic = %ev.topic,
                kind = a.kind.as_str(),
                severity = ?a.severity,
                current = a.current_value,
                threshold = a.threshold_value,
                ts = %ev.ts.to_rfc3339(),
                "{}",
                a.message
            );
        }
        Ok(())
    }
}

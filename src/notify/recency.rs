// src/notify/recency.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;

use crate::alerts::AlertKind;

/// Cooldown gate keyed by (topic, alert kind).
/// - First alert for a key always passes.
/// - Inside the window, the same key is suppressed.
/// - State only changes through `record_alert`, after a delivery; keys whose
///   window has lapsed are dropped there.
#[derive(Debug, Clone, Default)]
pub struct RecencyGate {
    window: ChronoDuration,
    last: HashMap<(String, AlertKind), DateTime<Utc>>,
}

impl RecencyGate {
    /// `window_secs` < 0 is treated as 0 (no suppression).
    pub fn new(window_secs: i64) -> Self {
        Self {
            window: ChronoDuration::seconds(window_secs.max(0)),
            last: HashMap::new(),
        }
    }

    /// Does NOT mutate state.
    pub fn should_alert(&self, topic: &str, kind: AlertKind, now: DateTime<Utc>) -> bool {
        match self.last.get(&(topic.to_string(), kind)) {
            None => true,
            Some(ts) => now.signed_duration_since(*ts) >= self.window,
        }
    }

    pub fn record_alert(&mut self, topic: &str, kind: AlertKind, now: DateTime<Utc>) {
        let window = self.window;
        self.last.retain(|_, ts| now.signed_duration_since(*ts) < window);
        self.last.insert((topic.to_string(), kind), now);
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_alert_passes() {
        let g = RecencyGate::new(3_600);
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        assert!(g.should_alert("rust", AlertKind::VolumeSpike, now));
    }

    #[test]
    fn inside_window_blocked_per_kind() {
        let mut g = RecencyGate::new(3_600);
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        g.record_alert("rust", AlertKind::VolumeSpike, t0);
        let t1 = t0 + ChronoDuration::seconds(120);
        assert!(!g.should_alert("rust", AlertKind::VolumeSpike, t1));
        assert!(g.should_alert("rust", AlertKind::RapidChange, t1));
    }

    #[test]
    fn window_edge_passes() {
        let mut g = RecencyGate::new(3_600);
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        g.record_alert("rust", AlertKind::RapidChange, t0);
        assert!(g.should_alert("rust", AlertKind::RapidChange, t0 + ChronoDuration::seconds(3_600)));
    }

    #[test]
    fn lapsed_keys_are_forgotten() {
        let mut g = RecencyGate::new(3_600);
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        for topic in ["a", "b", "c"] {
            g.record_alert(topic, AlertKind::VolumeSpike, t0);
        }
        assert_eq!(g.len(), 3);

        let t1 = t0 + ChronoDuration::seconds(1_800);
        g.record_alert("d", AlertKind::VolumeSpike, t1);
        assert_eq!(g.len(), 4);

        let t2 = t0 + ChronoDuration::seconds(3_600);
        g.record_alert("e", AlertKind::RapidChange, t2);
        assert_eq!(g.len(), 2);
        assert!(g.should_alert("a", AlertKind::VolumeSpike, t2));
        assert!(!g.should_alert("d", AlertKind::VolumeSpike, t2));
    }

    #[test]
    fn negative_window_never_blocks() {
        let mut g = RecencyGate::new(-5);
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        g.record_alert("rust", AlertKind::RapidChange, t0);
        assert!(g.should_alert("rust", AlertKind::RapidChange, t0));
    }
}

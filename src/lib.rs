// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod alerts;
pub mod analytics;
pub mod api;
pub mod config;
pub mod engine;
pub mod insights;
pub mod metrics;
pub mod monitor;
pub mod normalize;
pub mod notify;
pub mod sentiment;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{AggregatedSentiment, Aggregator, SentimentLabel};
pub use crate::analytics::{Outcome, SentimentSample};
pub use crate::api::create_router;
pub use crate::config::EngineConfig;
pub use crate::engine::{CancelFlag, SentimentEngine, TextRecord};
pub use crate::monitor::TopicAnalytics;
pub use crate::sentiment::{ModelSentimentResult, SentimentModel};

// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::alerts::AlertCondition;
use crate::config::EngineConfig;
use crate::engine::{BatchEntry, CancelFlag, ModelInfo, ScoredText, SentimentEngine, TextRecord};
use crate::insights::{Insight, TopicComparison};
use crate::monitor::TopicAnalytics;
use crate::notify::{AlertDispatcher, NotifierMux, DEFAULT_RECENCY_SECS};
use crate::storage::{DynStore, InMemoryStore, StoredSentiment};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SentimentEngine>,
    pub analytics: TopicAnalytics,
    pub dispatcher: Arc<AlertDispatcher>,
}

impl AppState {
    pub fn new(engine: Arc<SentimentEngine>, store: DynStore, cfg: &EngineConfig, mux: NotifierMux) -> Self {
        Self {
            engine,
            analytics: TopicAnalytics::new(store, cfg),
            dispatcher: Arc::new(AlertDispatcher::new(mux, DEFAULT_RECENCY_SECS)),
        }
    }

    /// Built-in adapters, in-memory store with retention, log notifier.
    pub async fn from_config(cfg: &EngineConfig) -> Self {
        let engine = Arc::new(SentimentEngine::from_config(cfg).await);
        let store = Arc::new(InMemoryStore::with_retention(cfg.analytics.retention_hours));
        Self::new(engine, store, cfg, NotifierMux::with_log())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/models", get(models))
        .route("/analyze", post(analyze))
        .route("/batch", post(analyze_batch))
        .route("/topics/{topic}/insights", get(topic_insights))
        .route("/topics/{topic}/alerts", get(topic_alerts))
        .route("/compare", get(compare))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body: `{"error": "..."}`.
pub enum ApiError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(e) => {
                error!(target: "api", error = %format!("{e:#}"), "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeReq {
    text: String,
    #[serde(default)]
    id: Option<String>,
    /// With a topic the score is stored for analytics.
    #[serde(default)]
    topic: Option<String>,
    /// Defaults to now.
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResp {
    #[serde(flatten)]
    scored: ScoredText,
    stored: bool,
}

async fn models(State(state): State<AppState>) -> Json<Vec<ModelInfo>> {
    Json(state.engine.model_info())
}

async fn store_scored(
    state: &AppState,
    scored: &ScoredText,
    topic: Option<&str>,
    timestamp: Option<DateTime<Utc>>,
) -> anyhow::Result<bool> {
    let (Some(topic), Some(sentiment)) = (topic, scored.sentiment.as_ref()) else {
        return Ok(false);
    };
    state
        .analytics
        .store()
        .persist(StoredSentiment {
            id: scored.id.clone(),
            topic: topic.to_string(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
            sentiment: sentiment.clone(),
        })
        .await?;
    Ok(true)
}

async fn analyze(State(state): State<AppState>, Json(body): Json<AnalyzeReq>) -> Result<Json<AnalyzeResp>, ApiError> {
    let scored = state
        .engine
        .analyze(TextRecord {
            id: body.id,
            text: body.text,
        })
        .await;
    let stored = store_scored(&state, &scored, body.topic.as_deref(), body.timestamp).await?;
    Ok(Json(AnalyzeResp { scored, stored }))
}

async fn analyze_batch(
    State(state): State<AppState>,
    Json(items): Json<Vec<AnalyzeReq>>,
) -> Result<Json<Vec<BatchEntry>>, ApiError> {
    let records: Vec<TextRecord> = items
        .iter()
        .map(|it| TextRecord {
            id: it.id.clone(),
            text: it.text.clone(),
        })
        .collect();
    let entries = state.engine.score_batch(records, &CancelFlag::new()).await;

    for (it, entry) in items.iter().zip(&entries) {
        if let BatchEntry::Scored(scored) = entry {
            store_scored(&state, scored, it.topic.as_deref(), it.timestamp).await?;
        }
    }
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    #[serde(default)]
    hours: Option<u32>,
}

fn window_hours(state: &AppState, hours: Option<u32>) -> Result<u32, ApiError> {
    match hours {
        Some(0) => Err(ApiError::BadRequest("hours must be greater than zero".into())),
        Some(h) if h > state.analytics.max_window_hours() => Err(ApiError::BadRequest(format!(
            "hours must be at most {}",
            state.analytics.max_window_hours()
        ))),
        Some(h) => Ok(h),
        None => Ok(state.analytics.default_window_hours()),
    }
}

async fn topic_insights(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Query(q): Query<WindowQuery>,
) -> Result<Json<Insight>, ApiError> {
    let hours = window_hours(&state, q.hours)?;
    let insight = state.analytics.generate_insights(&topic, hours, Utc::now()).await?;
    Ok(Json(insight))
}

#[derive(Debug, Serialize)]
struct AlertsResp {
    topic: String,
    alerts: Vec<AlertCondition>,
    /// Subset handed to notifiers (the rest were sent recently).
    delivered: Vec<AlertCondition>,
}

async fn topic_alerts(State(state): State<AppState>, Path(topic): Path<String>) -> Result<Json<AlertsResp>, ApiError> {
    let now = Utc::now();
    let alerts = state.analytics.check_alert_conditions(&topic, now).await?;
    let delivered = state.dispatcher.dispatch(&topic, &alerts, now).await?;
    Ok(Json(AlertsResp {
        topic,
        alerts,
        delivered,
    }))
}

#[derive(Debug, Deserialize)]
struct CompareQuery {
    topics: String,
    #[serde(default)]
    hours: Option<u32>,
}

async fn compare(State(state): State<AppState>, Query(q): Query<CompareQuery>) -> Result<Json<TopicComparison>, ApiError> {
    let hours = window_hours(&state, q.hours)?;
    let topics: Vec<String> = q
        .topics
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    let cmp = state
        .analytics
        .compare_topics(&topics, hours, Utc::now())
        .await?
        .ok_or_else(|| ApiError::BadRequest("no topics given".into()))?;
    Ok(Json(cmp))
}

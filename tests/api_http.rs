// tests/api_http.rs
//
// HTTP surface, driven in-process with tower's oneshot.
//
// Covered:
// - /health and /models
// - /analyze with and without a topic (storage flag)
// - /batch keeps order and stores topic'd entries
// - /topics/{topic}/insights (window validation incl. oversized hours, insufficient-data payloads)
// - /topics/{topic}/alerts delivers once per recency window
// - /compare validation and ranking

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt as _;

use sentiment_monitor::api::{create_router, AppState};
use sentiment_monitor::config::EngineConfig;
use sentiment_monitor::engine::SentimentEngine;
use sentiment_monitor::notify::NotifierMux;
use sentiment_monitor::sentiment::{DynModel, LexiconModel, ModelSentimentResult, SentimentModel};
use sentiment_monitor::storage::InMemoryStore;

const BODY_LIMIT: usize = 1_048_576;

/// Scores "bad" texts at -0.9 and everything else at 0.6.
struct Keyword;

#[async_trait::async_trait]
impl SentimentModel for Keyword {
    fn id(&self) -> &str {
        "keyword"
    }
    fn version(&self) -> &str {
        "k1"
    }
    fn available(&self) -> bool {
        true
    }
    async fn analyze(&self, text: &str) -> ModelSentimentResult {
        let compound = if text.contains("bad") { -0.9 } else { 0.6 };
        ModelSentimentResult {
            model_id: "keyword".to_string(),
            model_version: "k1".to_string(),
            compound,
            positive: compound.max(0.0),
            negative: (-compound).max(0.0),
            neutral: 1.0 - compound.abs(),
            confidence: 0.9,
            processing_time: 0.0,
            raw: Value::Null,
        }
    }
}

fn app() -> Router {
    let cfg = EngineConfig::default();
    let models: Vec<DynModel> = vec![Arc::new(Keyword)];
    let engine = Arc::new(SentimentEngine::with_models(&cfg, models));
    create_router(AppState::new(
        engine,
        Arc::new(InMemoryStore::new()),
        &cfg,
        NotifierMux::with_log(),
    ))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_and_models() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");

    let (status, v) = get(&app, "/models").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v[0]["id"], "keyword");
    assert_eq!(v[0]["version"], "k1");
    assert_eq!(v[0]["available"], true);
    assert_eq!(v[0]["weight"], 1.0);
}

#[tokio::test]
async fn analyze_stores_only_with_topic() {
    let app = app();
    let (status, v) = post(&app, "/analyze", json!({ "text": "Shipping today!" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["stored"], false);
    assert_eq!(v["sentiment"]["label"], "positive");
    assert_eq!(v["id"].as_str().unwrap().len(), 16);

    let (_, v) = post(
        &app,
        "/analyze",
        json!({ "id": "p1", "text": "Shipping today!", "topic": "launch" }),
    )
    .await;
    assert_eq!(v["id"], "p1");
    assert_eq!(v["stored"], true);

    let (status, v) = get(&app, "/topics/launch/insights?hours=24").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["topic"], "launch");
    assert_eq!(v["summary"]["post_count"], 1);
    assert_eq!(v["trend"]["direction"], "insufficient_data");
    assert_eq!(v["momentum"]["status"], "insufficient_data");
    assert_eq!(v["momentum"]["required"], 5);
    assert_eq!(v["momentum"]["available"], 1);
    assert_eq!(
        v["recommendations"][0],
        "Consider expanding data collection - low post volume detected"
    );
}

#[tokio::test]
async fn empty_text_is_not_stored() {
    let app = app();
    let (status, v) = post(&app, "/analyze", json!({ "text": "  ", "topic": "launch" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["stored"], false);
    assert!(v["sentiment"].is_null());
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = app();
    let (status, _) = post(&app, "/analyze", json!({ "body": "no text field" })).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn batch_then_alerts_deliver_once() {
    let app = app();
    let items: Vec<Value> = (0..12)
        .map(|i| json!({ "id": format!("o{i}"), "text": format!("bad outage {i}"), "topic": "outage" }))
        .collect();
    let (status, v) = post(&app, "/batch", Value::Array(items)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = v.as_array().unwrap();
    assert_eq!(entries.len(), 12);
    assert_eq!(entries[0]["status"], "scored");
    assert_eq!(entries[0]["id"], "o0");
    assert_eq!(entries[11]["id"], "o11");

    let (status, v) = get(&app, "/topics/outage/alerts").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = v["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["kind"], "sentiment_threshold");
    assert_eq!(alerts[0]["severity"], "critical");
    assert_eq!(alerts[1]["kind"], "volume_spike");
    assert_eq!(v["delivered"].as_array().unwrap().len(), 2);

    // same conditions again: still reported, not re-delivered
    let (_, v) = get(&app, "/topics/outage/alerts").await;
    assert_eq!(v["alerts"].as_array().unwrap().len(), 2);
    assert!(v["delivered"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn window_must_be_positive() {
    let app = app();
    let (status, v) = get(&app, "/topics/launch/insights?hours=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("hours"));

    let (status, _) = get(&app, "/compare?topics=a,b&hours=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_window_is_rejected_not_fatal() {
    let app = app();
    for uri in [
        "/topics/x/insights?hours=4000000000",
        "/topics/x/insights?hours=721",
        "/compare?topics=a,b&hours=4000000000",
    ] {
        let (status, v) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(v["error"].as_str().unwrap().contains("at most 720"), "{uri}: {v}");
    }

    // the largest accepted window still answers
    let (status, v) = get(&app, "/topics/x/insights?hours=720").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["window_hours"], 720);
}

#[tokio::test]
async fn compare_ranks_and_rejects_empty() {
    let app = app();
    let (status, _) = get(&app, "/compare?topics=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    post(&app, "/analyze", json!({ "text": "love it", "topic": "launch" })).await;
    post(&app, "/analyze", json!({ "text": "bad bug", "topic": "outage" })).await;
    post(&app, "/analyze", json!({ "text": "bad crash", "topic": "outage" })).await;

    let (status, v) = get(&app, "/compare?topics=launch,%20outage").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["topics"].as_array().unwrap().len(), 2);
    assert_eq!(v["best_performing"], "launch");
    assert_eq!(v["worst_performing"], "outage");
    assert_eq!(v["most_discussed"], "outage");
    assert_eq!(v["volume_range"], 1);
}

#[tokio::test]
async fn lexicon_only_state_from_defaults() {
    // no neural endpoint configured: the lexicon carries the score alone
    let cfg = EngineConfig::default();
    let models: Vec<DynModel> = vec![Arc::new(LexiconModel::new())];
    let engine = Arc::new(SentimentEngine::with_models(&cfg, models));
    let app = create_router(AppState::new(
        engine,
        Arc::new(InMemoryStore::new()),
        &cfg,
        NotifierMux::with_log(),
    ));
    let (_, v) = post(&app, "/analyze", json!({ "text": "good" })).await;
    let compound = v["sentiment"]["compound"].as_f64().unwrap();
    assert!((compound - 0.4404).abs() < 1e-4, "{compound}");
}

//! Topic Sentiment Monitor: binary entrypoint.
//! Loads config, builds the scoring engine and analytics state, and serves
//! the Axum router (plus `/metrics`) on Shuttle.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sentiment_monitor::api::{create_router, AppState};
use sentiment_monitor::config::EngineConfig;
use sentiment_monitor::metrics::Metrics;

const DEFAULT_LOG_FILTER: &str = "engine=info,analytics=info,alerts=info,notify=info,config=info,api=info,warn";

/// Compact logs, filtered by `RUST_LOG`. JSON lines when `LOG_FORMAT=json`.
/// Leaves an already installed subscriber (e.g. the runtime's) in place.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = EngineConfig::load_default().context("loading engine config")?;
    let metrics = Metrics::init()?;

    let state = AppState::from_config(&cfg).await;
    if !state.engine.has_available_model() {
        tracing::warn!(target: "engine", "no sentiment model available; texts will not be scored");
    }

    let router = create_router(state).merge(metrics.router());
    Ok(router.into())
}

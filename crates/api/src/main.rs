use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fourcast_core::domain::prediction::{ForecastHistoryEntry, StockPrediction};
use fourcast_core::forecast::{ForecastEngine, ForecastOptions, InvalidRequest};
use fourcast_core::ingest::provider::HttpMarketData;
use fourcast_core::llm::anthropic::AnthropicClient;
use fourcast_core::storage::history::{HistoryStore, PgHistoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fourcast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match fourcast_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; forecast history disabled");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; forecast history disabled");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; forecast history disabled");
            None
        }
    };

    // The engine runs without a model or history store, but not without a
    // market data client. Only the latter puts the API in degraded mode.
    let engine: Option<Arc<ForecastEngine>> = match HttpMarketData::from_settings(&settings) {
        Ok(market) => {
            let mut engine = ForecastEngine::new(Arc::new(market));
            match AnthropicClient::from_settings(&settings) {
                Ok(llm) => engine = engine.with_generative(Arc::new(llm)),
                Err(e) => {
                    tracing::warn!(error = %e, "generative client unavailable; forecasts will blend history or fall back");
                }
            }
            if let Some(pool) = &pool {
                engine = engine.with_history(Arc::new(PgHistoryStore::new(pool.clone())));
            }
            Some(Arc::new(engine))
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "market data client unavailable; starting API in degraded mode");
            None
        }
    };

    let state = AppState { engine, pool };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/forecast/:symbol", post(post_forecast))
        .route("/history/:symbol", get(get_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    engine: Option<Arc<ForecastEngine>>,
    pool: Option<PgPool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastRequest {
    current_price: f64,
    #[serde(default)]
    quick: bool,
    #[serde(default)]
    industry: Option<String>,
}

async fn post_forecast(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(req): Json<ForecastRequest>,
) -> Result<Json<StockPrediction>, StatusCode> {
    let Some(engine) = &state.engine else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let options = ForecastOptions {
        quick: req.quick,
        industry: req.industry,
    };

    match engine.forecast(&symbol, req.current_price, &options).await {
        Ok(prediction) => Ok(Json(prediction)),
        Err(e) => {
            if let Some(invalid) = e.downcast_ref::<InvalidRequest>() {
                tracing::debug!(%symbol, error = %invalid, "rejected forecast request");
                return Err(StatusCode::BAD_REQUEST);
            }
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, %symbol, "forecast failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ForecastHistoryEntry>>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let store = PgHistoryStore::new(pool.clone());

    match store.recent(&symbol, limit).await {
        Ok(entries) => Ok(Json(entries)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, %symbol, "history lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &fourcast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

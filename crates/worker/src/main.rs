use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fourcast_core::forecast::{ForecastEngine, ForecastOptions};
use fourcast_core::ingest::provider::{HttpMarketData, MarketDataClient};
use fourcast_core::llm::anthropic::AnthropicClient;
use fourcast_core::storage::history::PgHistoryStore;
use fourcast_core::storage::lock::{release_symbol_lock, try_acquire_symbol_lock};

#[derive(Debug, Parser)]
#[command(name = "fourcast_worker")]
struct Args {
    /// Ticker symbol to forecast.
    #[arg(long)]
    symbol: String,

    /// Current price. Resolved from the live quote when omitted.
    #[arg(long)]
    price: Option<f64>,

    /// Skip news and technical context for a faster, cheaper run.
    /// Quick runs are never written to history.
    #[arg(long)]
    quick: bool,

    /// Override the provider's industry classification.
    #[arg(long)]
    industry: Option<String>,

    /// Do everything except touching the database.
    #[arg(long)]
    dry_run: bool,

    /// Fix the perturbation RNG for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
}

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

    let args = Args::parse();
    let symbol = args.symbol.trim().to_string();
    anyhow::ensure!(!symbol.is_empty(), "--symbol must not be blank");

    let market: Arc<dyn MarketDataClient> = Arc::new(HttpMarketData::from_settings(&settings)?);

    let price = match args.price {
        Some(p) => p,
        None => {
            market
                .quote(&symbol)
                .await
                .with_context(|| format!("resolve current price for {symbol}"))?
                .with_context(|| format!("no quote available for {symbol}; pass --price"))?
                .price
        }
    };

    let mut engine = ForecastEngine::new(Arc::clone(&market));
    match AnthropicClient::from_settings(&settings) {
        Ok(llm) => engine = engine.with_generative(Arc::new(llm)),
        Err(e) => {
            tracing::warn!(error = %e, "generative client unavailable; forecast will blend history or fall back");
        }
    }
    if let Some(seed) = args.seed {
        engine = engine.with_seed(seed);
    }

    let pool = if args.dry_run {
        tracing::info!(%symbol, dry_run = true, "skipping database: no history reads, no lock");
        None
    } else {
        let db_url = settings.require_database_url()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL failed")?;
        fourcast_core::storage::migrate(&pool).await?;

        let acquired = try_acquire_symbol_lock(&pool, &symbol).await?;
        if !acquired {
            tracing::warn!(%symbol, "symbol lock not acquired; another run in progress");
            return Ok(());
        }

        engine = engine.with_history(Arc::new(PgHistoryStore::new(pool.clone())));
        Some(pool)
    };

    let options = ForecastOptions {
        quick: args.quick,
        industry: args.industry.clone(),
    };

    let result = engine.forecast(&symbol, price, &options).await;

    match &result {
        Ok(prediction) => {
            println!("{}", serde_json::to_string_pretty(prediction)?);
            tracing::info!(
                %symbol,
                confidence = prediction.confidence_level,
                "forecast complete"
            );
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(err);
            tracing::error!(%symbol, error = %err, "forecast run failed");
        }
    }

    if let Some(pool) = &pool {
        if result.is_ok() && !args.quick {
            // History persists on a background task; let it land before the
            // process exits.
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        }
        let _ = release_symbol_lock(pool, &symbol).await;
    }

    result.map(|_| ())
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

pub mod assemble;
pub mod blend;
pub mod enhance;
pub mod fallback;
pub mod horizons;
pub mod industry;
pub mod prompt;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::analysis::AnalysisRecord;
use crate::domain::contract::{GateVerdict, ModelForecast};
use crate::domain::prediction::{ForecastHistoryEntry, Horizon, StockPrediction};
use crate::forecast::industry::IndustryProfile;
use crate::ingest::provider::MarketDataClient;
use crate::llm::error::GenerativeDiagnosticsError;
use crate::llm::{json, CompleteOptions, GenerativeClient};
use crate::storage::history::HistoryStore;

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HISTORY_LIMIT: i64 = 10;
const DEFAULT_CONFIDENCE: f64 = 70.0;

#[derive(Debug, Clone, Default)]
pub struct ForecastOptions {
    /// Skip news/technical prompt detail and halve the model token budget;
    /// with no fundamentals at all, skip the model entirely. Quick results
    /// are never written to history.
    pub quick: bool,
    /// Caller-supplied industry label, overriding the provider's.
    pub industry: Option<String>,
}

/// The only error a caller sees: bad input. Everything that goes wrong
/// upstream degrades into a fallback forecast instead.
#[derive(Debug)]
pub struct InvalidRequest(pub String);

impl fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid forecast request: {}", self.0)
    }
}

impl std::error::Error for InvalidRequest {}

pub struct ForecastEngine {
    market: Arc<dyn MarketDataClient>,
    llm: Option<Arc<dyn GenerativeClient>>,
    history: Option<Arc<dyn HistoryStore>>,
    history_limit: i64,
    llm_timeout: Duration,
    rng_seed: Option<u64>,
}

impl ForecastEngine {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        let timeout_secs = std::env::var("GENERATIVE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
        let history_limit = std::env::var("FORECAST_HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        Self {
            market,
            llm: None,
            history: None,
            history_limit,
            llm_timeout: Duration::from_secs(timeout_secs),
            rng_seed: None,
        }
    }

    pub fn with_generative(mut self, llm: Arc<dyn GenerativeClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Fix the perturbation RNG. Intended for tests and reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    fn request_rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Produce a reconciled multi-horizon forecast for one symbol.
    ///
    /// Invalid caller input is the only error path. A missing or unusable
    /// model reply, missing market data, or a dead history store all degrade
    /// into blended-history or fallback output.
    pub async fn forecast(
        &self,
        symbol: &str,
        current_price: f64,
        options: &ForecastOptions,
    ) -> anyhow::Result<StockPrediction> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(InvalidRequest("symbol must not be empty".to_string()).into());
        }
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(InvalidRequest(format!(
                "current price must be a positive number, got {current_price}"
            ))
            .into());
        }

        let (fundamentals, quote, articles, history) = tokio::join!(
            self.market.fundamentals(symbol),
            self.market.quote(symbol),
            self.market.news(symbol, 5),
            self.recent_history(symbol),
        );
        let fundamentals = flatten_opt(symbol, "fundamentals", fundamentals);
        let quote = flatten_opt(symbol, "quote", quote);
        let articles = flatten_vec(symbol, "news", articles);

        let record = assemble::assemble(
            symbol,
            current_price,
            fundamentals,
            quote,
            articles,
            options.industry.clone(),
            history,
        );
        let profile = industry::lookup(record.industry.as_deref());
        let mut rng = self.request_rng();

        let skip_model = options.quick && record.fundamentals.is_empty();
        let raw_forecast = if skip_model {
            tracing::debug!(
                symbol,
                "quick request with no fundamentals; skipping the generative call"
            );
            None
        } else {
            self.request_model_forecast(&record, profile, options.quick)
                .await
        };

        let mut prediction = match (&raw_forecast, record.history.is_empty()) {
            (None, true) => fallback::fallback_prediction(symbol, current_price, profile),
            (forecast, _) => {
                let outcome = blend::blend(
                    forecast.as_ref().map(|f| &f.predicted_price),
                    current_price,
                    &profile.bounds,
                    &record.history,
                    &mut rng,
                );
                match forecast {
                    Some(forecast) => StockPrediction {
                        symbol: symbol.to_string(),
                        current_price,
                        predicted_price: outcome.prices.clone(),
                        sentiment: forecast
                            .sentiment
                            .as_deref()
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .unwrap_or_else(|| {
                                format!(
                                    "Outlook blended from model and historical signals. {}",
                                    profile.growth_note
                                )
                            }),
                        confidence_level: forecast
                            .confidence_level
                            .unwrap_or(DEFAULT_CONFIDENCE)
                            .clamp(0.0, 100.0),
                        key_drivers: fallback::normalize_list(
                            forecast.key_drivers.clone(),
                            fallback::GENERIC_DRIVERS,
                        ),
                        risks: fallback::normalize_list(
                            forecast.risks.clone(),
                            fallback::GENERIC_RISKS,
                        ),
                        analyst_data: None,
                        market_sentiment: None,
                        fundamentals: None,
                        upcoming_catalysts: None,
                        earnings_data: None,
                    },
                    None => {
                        let mut prediction =
                            fallback::fallback_prediction(symbol, current_price, profile);
                        prediction.predicted_price = outcome.prices.clone();
                        if let Some(consistency) = outcome.consistency {
                            prediction.sentiment = format!(
                                "{} Past forecasts for this symbol show {} consistency.",
                                prediction.sentiment,
                                consistency.as_str()
                            );
                        }
                        prediction
                    }
                }
            }
        };

        let hist_trend_one_year =
            blend::weighted_history_trend(&record.history, Horizon::OneYear).unwrap_or(0.0);
        self.apply_enhancers(&mut prediction, &profile.bounds, hist_trend_one_year, &mut rng)
            .await;

        if !options.quick {
            self.spawn_history_write(&prediction);
        }

        Ok(prediction)
    }

    async fn request_model_forecast(
        &self,
        record: &AnalysisRecord,
        profile: &IndustryProfile,
        quick: bool,
    ) -> Option<ModelForecast> {
        let llm = self.llm.as_ref()?;
        let prompt = prompt::build(record, profile, quick);
        let options = if quick {
            CompleteOptions {
                temperature: 0.2,
                max_tokens: 512,
            }
        } else {
            CompleteOptions {
                temperature: 0.3,
                max_tokens: 1024,
            }
        };

        let reply = match tokio::time::timeout(self.llm_timeout, llm.complete(&prompt, &options))
            .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                tracing::warn!(
                    symbol = %record.symbol,
                    provider = llm.name(),
                    error = %err,
                    "generative call failed; continuing without a model forecast"
                );
                if let Some(raw) = err
                    .downcast_ref::<GenerativeDiagnosticsError>()
                    .and_then(|diag| diag.raw_output.as_deref())
                {
                    tracing::debug!(symbol = %record.symbol, raw_output = %raw, "upstream reply body");
                }
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    symbol = %record.symbol,
                    provider = llm.name(),
                    timeout_secs = self.llm_timeout.as_secs(),
                    "generative call timed out; continuing without a model forecast"
                );
                return None;
            }
        };

        let forecast = match json::decode_forecast(&reply) {
            Ok(forecast) => forecast,
            Err(err) => {
                tracing::warn!(
                    symbol = %record.symbol,
                    error = %err,
                    "model reply did not decode; continuing without a model forecast"
                );
                return None;
            }
        };

        match forecast.gate(record.current_price) {
            GateVerdict::Pass => Some(forecast),
            GateVerdict::BelowMargin { horizons } => {
                // Blending repairs exactly these horizons; the rest of the
                // forecast is still usable.
                tracing::info!(
                    symbol = %record.symbol,
                    ?horizons,
                    "model echoed near-current prices on some horizons"
                );
                Some(forecast)
            }
            GateVerdict::Rejected { reason } => {
                tracing::warn!(
                    symbol = %record.symbol,
                    %reason,
                    "model forecast rejected; continuing without it"
                );
                None
            }
        }
    }

    async fn apply_enhancers<R: rand::Rng>(
        &self,
        prediction: &mut StockPrediction,
        bounds: &industry::BoundTable,
        hist_trend_one_year: f64,
        rng: &mut R,
    ) {
        let symbol = prediction.symbol.clone();
        let (estimates, trends, ev, calendar) = tokio::join!(
            self.market.analyst_estimates(&symbol),
            self.market.recommendation_trends(&symbol),
            self.market.enterprise_value(&symbol),
            self.market.earnings_calendar(&symbol),
        );

        if let Some(estimates) = flatten_opt(&symbol, "analyst_estimates", estimates) {
            enhance::apply_analyst_estimates(
                prediction,
                &estimates,
                bounds,
                hist_trend_one_year,
                rng,
            );
        }
        if let Some(trends) = flatten_opt(&symbol, "recommendation_trends", trends) {
            enhance::apply_recommendation_trend(prediction, &trends);
        }
        if let Some(ev) = flatten_opt(&symbol, "enterprise_value", ev) {
            enhance::apply_enterprise_value(prediction, &ev);
        }
        let calendar = flatten_vec(&symbol, "earnings_calendar", calendar);
        if !calendar.is_empty() {
            enhance::apply_earnings_calendar(prediction, &calendar, Utc::now().date_naive());
        }
    }

    async fn recent_history(&self, symbol: &str) -> Vec<ForecastHistoryEntry> {
        let store = match &self.history {
            Some(store) => store,
            None => return Vec::new(),
        };
        match store.recent(symbol, self.history_limit).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    symbol,
                    error = %err,
                    "failed to load forecast history; continuing without it"
                );
                Vec::new()
            }
        }
    }

    fn spawn_history_write(&self, prediction: &StockPrediction) {
        let store = match self.history.clone() {
            Some(store) => store,
            None => return,
        };
        let entry = ForecastHistoryEntry {
            symbol: prediction.symbol.clone(),
            price_at_forecast: prediction.current_price,
            predicted: prediction.predicted_price.clone(),
            sentiment: prediction.sentiment.clone(),
            confidence: prediction.confidence_level,
            key_drivers: prediction.key_drivers.clone(),
            risks: prediction.risks.clone(),
            created_at: Utc::now(),
        };
        tokio::spawn(async move {
            if let Err(err) = store.append(&entry).await {
                tracing::warn!(
                    symbol = %entry.symbol,
                    error = %err,
                    "failed to append forecast history"
                );
            }
        });
    }
}

fn flatten_opt<T>(symbol: &str, what: &'static str, res: anyhow::Result<Option<T>>) -> Option<T> {
    match res {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(symbol, what, error = %err, "market data fetch failed; continuing without it");
            None
        }
    }
}

fn flatten_vec<T>(symbol: &str, what: &'static str, res: anyhow::Result<Vec<T>>) -> Vec<T> {
    match res {
        Ok(values) => values,
        Err(err) => {
            tracing::warn!(symbol, what, error = %err, "market data fetch failed; continuing without it");
            Vec::new()
        }
    }
}

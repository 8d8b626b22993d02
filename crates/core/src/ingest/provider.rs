use crate::config::Settings;
use crate::ingest::types::{
    AnalystEstimates, Article, EarningsEvent, EnterpriseValue, FundamentalsRaw, Quote,
    RecommendationTrends,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Upstream market-data service. Every call may fail or come back partial;
/// callers must treat the data as optional.
#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn quote(&self, symbol: &str) -> Result<Option<Quote>>;

    async fn fundamentals(&self, symbol: &str) -> Result<Option<FundamentalsRaw>>;

    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<Article>>;

    async fn analyst_estimates(&self, symbol: &str) -> Result<Option<AnalystEstimates>>;

    async fn recommendation_trends(&self, symbol: &str) -> Result<Option<RecommendationTrends>>;

    async fn enterprise_value(&self, symbol: &str) -> Result<Option<EnterpriseValue>>;

    async fn earnings_calendar(&self, symbol: &str) -> Result<Vec<EarningsEvent>>;
}

#[derive(Debug, Clone)]
pub struct HttpMarketData {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMarketData {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_market_data_base_url()?.to_string();
        let api_key = settings.market_data_api_key.clone();

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        let headers = self.headers()?;

        let res = self
            .http
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("market data response is not the expected shape: {text}"))
    }
}

#[async_trait::async_trait]
impl MarketDataClient for HttpMarketData {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let wire: Option<QuoteWire> = self.get_json(&format!("/v1/quote/{symbol}"), &[]).await?;
        Ok(wire.and_then(|w| w.into_quote(symbol)))
    }

    async fn fundamentals(&self, symbol: &str) -> Result<Option<FundamentalsRaw>> {
        let wire: Option<FundamentalsWire> = self
            .get_json(&format!("/v1/fundamentals/{symbol}"), &[])
            .await?;
        Ok(wire.map(FundamentalsWire::into_fundamentals))
    }

    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<Article>> {
        let wire: Vec<ArticleWire> = self
            .get_json(
                &format!("/v1/news/{symbol}"),
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(wire.into_iter().map(ArticleWire::into_article).collect())
    }

    async fn analyst_estimates(&self, symbol: &str) -> Result<Option<AnalystEstimates>> {
        let wire: Option<AnalystEstimatesWire> = self
            .get_json(&format!("/v1/analyst-estimates/{symbol}"), &[])
            .await?;
        Ok(wire.map(|w| AnalystEstimates {
            eps_this_year: w.eps_this_year,
            eps_next_year: w.eps_next_year,
            analyst_count: w.analyst_count,
        }))
    }

    async fn recommendation_trends(&self, symbol: &str) -> Result<Option<RecommendationTrends>> {
        let wire: Option<RecommendationTrendsWire> = self
            .get_json(&format!("/v1/recommendation-trends/{symbol}"), &[])
            .await?;
        Ok(wire.map(|w| RecommendationTrends {
            strong_buy: w.strong_buy,
            buy: w.buy,
            hold: w.hold,
            sell: w.sell,
            strong_sell: w.strong_sell,
        }))
    }

    async fn enterprise_value(&self, symbol: &str) -> Result<Option<EnterpriseValue>> {
        let wire: Option<EnterpriseValueWire> = self
            .get_json(&format!("/v1/enterprise-value/{symbol}"), &[])
            .await?;
        Ok(wire.map(|w| EnterpriseValue {
            enterprise_value: w.enterprise_value,
            market_cap: w.market_cap,
            total_debt: w.total_debt,
            cash: w.cash,
        }))
    }

    async fn earnings_calendar(&self, symbol: &str) -> Result<Vec<EarningsEvent>> {
        let wire: Vec<EarningsEventWire> = self
            .get_json(&format!("/v1/earnings-calendar/{symbol}"), &[])
            .await?;
        Ok(wire
            .into_iter()
            .map(|w| EarningsEvent {
                date: w.date,
                eps_actual: w.eps_actual,
                eps_estimate: w.eps_estimate,
                revenue_actual: w.revenue_actual,
                revenue_estimate: w.revenue_estimate,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteWire {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    change_pct: Option<f64>,
    #[serde(default)]
    day_high: Option<f64>,
    #[serde(default)]
    day_low: Option<f64>,
    #[serde(default)]
    year_high: Option<f64>,
    #[serde(default)]
    year_low: Option<f64>,
    #[serde(default)]
    ma_50: Option<f64>,
    #[serde(default)]
    ma_200: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
}

impl QuoteWire {
    /// A quote without a positive price is no quote at all.
    fn into_quote(self, requested_symbol: &str) -> Option<Quote> {
        let price = self.price.filter(|p| p.is_finite() && *p > 0.0)?;
        Some(Quote {
            symbol: self
                .symbol
                .unwrap_or_else(|| requested_symbol.to_string()),
            price,
            change_pct: self.change_pct,
            day_high: self.day_high,
            day_low: self.day_low,
            year_high: self.year_high,
            year_low: self.year_low,
            ma_50: self.ma_50,
            ma_200: self.ma_200,
            volume: self.volume,
            market_cap: self.market_cap,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundamentalsWire {
    #[serde(default)]
    revenue_growth: Option<f64>,
    #[serde(default)]
    profit_margin: Option<f64>,
    #[serde(default)]
    pe_ratio: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    industry: Option<String>,
}

impl FundamentalsWire {
    fn into_fundamentals(self) -> FundamentalsRaw {
        FundamentalsRaw {
            revenue_growth: self.revenue_growth,
            profit_margin: self.profit_margin,
            pe_ratio: self.pe_ratio,
            market_cap: self.market_cap,
            industry: self.industry,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleWire {
    #[serde(default)]
    title: String,
    #[serde(default)]
    published_at: Option<NaiveDate>,
    #[serde(default)]
    site: Option<String>,
}

impl ArticleWire {
    fn into_article(self) -> Article {
        Article {
            title: self.title,
            published_at: self.published_at,
            site: self.site,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalystEstimatesWire {
    #[serde(default)]
    eps_this_year: Option<f64>,
    #[serde(default)]
    eps_next_year: Option<f64>,
    #[serde(default)]
    analyst_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationTrendsWire {
    #[serde(default)]
    strong_buy: i64,
    #[serde(default)]
    buy: i64,
    #[serde(default)]
    hold: i64,
    #[serde(default)]
    sell: i64,
    #[serde(default)]
    strong_sell: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnterpriseValueWire {
    #[serde(default)]
    enterprise_value: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    total_debt: Option<f64>,
    #[serde(default)]
    cash: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningsEventWire {
    date: NaiveDate,
    #[serde(default)]
    eps_actual: Option<f64>,
    #[serde(default)]
    eps_estimate: Option<f64>,
    #[serde(default)]
    revenue_actual: Option<f64>,
    #[serde(default)]
    revenue_estimate: Option<f64>,
}

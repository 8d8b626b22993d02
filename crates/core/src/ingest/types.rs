use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Latest trading snapshot for one instrument, normalized from the provider
/// payload. Everything past the price is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change_pct: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub year_high: Option<f64>,
    pub year_low: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_200: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsRaw {
    pub revenue_growth: Option<f64>,
    pub profit_margin: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub published_at: Option<NaiveDate>,
    pub site: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalystEstimates {
    pub eps_this_year: Option<f64>,
    pub eps_next_year: Option<f64>,
    pub analyst_count: Option<i64>,
}

/// Aggregated analyst recommendation counts for the most recent period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationTrends {
    pub strong_buy: i64,
    pub buy: i64,
    pub hold: i64,
    pub sell: i64,
    pub strong_sell: i64,
}

impl RecommendationTrends {
    pub fn total(&self) -> i64 {
        self.strong_buy + self.buy + self.hold + self.sell + self.strong_sell
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnterpriseValue {
    pub enterprise_value: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash: Option<f64>,
}

/// One row of the provider's earnings calendar, past or future.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub date: NaiveDate,
    pub eps_actual: Option<f64>,
    pub eps_estimate: Option<f64>,
    pub revenue_actual: Option<f64>,
    pub revenue_estimate: Option<f64>,
}

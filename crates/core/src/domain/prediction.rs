use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The four forecast horizons every prediction carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::OneMonth,
        Horizon::ThreeMonths,
        Horizon::SixMonths,
        Horizon::OneYear,
    ];

    /// Wire-contract field name, as rendered in the dashboard JSON.
    pub fn field_name(self) -> &'static str {
        match self {
            Horizon::OneMonth => "oneMonth",
            Horizon::ThreeMonths => "threeMonths",
            Horizon::SixMonths => "sixMonths",
            Horizon::OneYear => "oneYear",
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedPrice {
    pub one_month: f64,
    pub three_months: f64,
    pub six_months: f64,
    pub one_year: f64,
}

impl PredictedPrice {
    pub fn uniform(price: f64) -> Self {
        Self {
            one_month: price,
            three_months: price,
            six_months: price,
            one_year: price,
        }
    }

    pub fn get(&self, horizon: Horizon) -> f64 {
        match horizon {
            Horizon::OneMonth => self.one_month,
            Horizon::ThreeMonths => self.three_months,
            Horizon::SixMonths => self.six_months,
            Horizon::OneYear => self.one_year,
        }
    }

    pub fn get_mut(&mut self, horizon: Horizon) -> &mut f64 {
        match horizon {
            Horizon::OneMonth => &mut self.one_month,
            Horizon::ThreeMonths => &mut self.three_months,
            Horizon::SixMonths => &mut self.six_months,
            Horizon::OneYear => &mut self.one_year,
        }
    }
}

/// Final reconciled forecast, one per request. Serialized camelCase because it
/// is the dashboard wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPrediction {
    pub symbol: String,
    pub current_price: f64,
    pub predicted_price: PredictedPrice,
    pub sentiment: String,
    pub confidence_level: f64,
    pub key_drivers: Vec<String>,
    pub risks: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyst_data: Option<AnalystData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_sentiment: Option<MarketSentimentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundamentals: Option<FundamentalsData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_catalysts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings_data: Option<EarningsData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystData {
    pub eps_this_year: f64,
    pub eps_next_year: f64,
    pub implied_growth: f64,
    pub implied_one_year_price: f64,
    pub analyst_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSentimentData {
    pub score: f64,
    pub label: String,
    pub strong_buy: i64,
    pub buy: i64,
    pub hold: i64,
    pub sell: i64,
    pub strong_sell: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalsData {
    pub enterprise_value: f64,
    pub ev_to_market_cap: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsData {
    pub report_date: NaiveDate,
    pub eps_actual: Option<f64>,
    pub eps_estimate: Option<f64>,
    pub revenue_actual: Option<f64>,
    pub revenue_estimate: Option<f64>,
    pub eps_surprise_pct: Option<f64>,
}

/// One prior forecast for an instrument, immutable once written. Owned by the
/// history store; the engine only reads these, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastHistoryEntry {
    pub symbol: String,
    pub price_at_forecast: f64,
    pub predicted: PredictedPrice,
    pub sentiment: String,
    pub confidence: f64,
    pub key_drivers: Vec<String>,
    pub risks: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ForecastHistoryEntry {
    /// Fractional trend a past forecast implied for one horizon, relative to
    /// the price at the time the forecast was made.
    pub fn trend(&self, horizon: Horizon) -> f64 {
        if self.price_at_forecast <= 0.0 {
            return 0.0;
        }
        self.predicted.get(horizon) / self.price_at_forecast - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicted_price_serializes_camel_case() {
        let p = PredictedPrice {
            one_month: 101.0,
            three_months: 104.0,
            six_months: 108.0,
            one_year: 112.0,
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["oneMonth"], 101.0);
        assert_eq!(json["threeMonths"], 104.0);
        assert_eq!(json["sixMonths"], 108.0);
        assert_eq!(json["oneYear"], 112.0);
    }

    #[test]
    fn absent_enhancement_blocks_are_omitted() {
        let p = StockPrediction {
            symbol: "TEST".to_string(),
            current_price: 100.0,
            predicted_price: PredictedPrice::uniform(105.0),
            sentiment: "neutral".to_string(),
            confidence_level: 70.0,
            key_drivers: vec!["a".into(), "b".into(), "c".into()],
            risks: vec!["x".into(), "y".into(), "z".into()],
            analyst_data: None,
            market_sentiment: None,
            fundamentals: None,
            upcoming_catalysts: None,
            earnings_data: None,
        };
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("analystData").is_none());
        assert!(json.get("marketSentiment").is_none());
        assert!(json.get("upcomingCatalysts").is_none());
        assert_eq!(json["confidenceLevel"], 70.0);
    }

    #[test]
    fn history_trend_is_relative_to_entry_price() {
        let entry = ForecastHistoryEntry {
            symbol: "TEST".to_string(),
            price_at_forecast: 50.0,
            predicted: PredictedPrice {
                one_month: 51.0,
                three_months: 52.0,
                six_months: 54.0,
                one_year: 55.0,
            },
            sentiment: "positive".to_string(),
            confidence: 80.0,
            key_drivers: vec![],
            risks: vec![],
            created_at: Utc::now(),
        };
        assert!((entry.trend(Horizon::OneMonth) - 0.02).abs() < 1e-12);
        assert!((entry.trend(Horizon::OneYear) - 0.10).abs() < 1e-12);
    }
}

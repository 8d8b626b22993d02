use crate::domain::prediction::ForecastHistoryEntry;
use serde::{Deserialize, Serialize};

/// Flat per-request view of everything known about an instrument. Built fresh
/// for every forecast request; nothing here survives the request.
///
/// Missing upstream data is always `None`, never zero, so downstream logic
/// can tell "no data" from "zero growth".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub symbol: String,
    pub current_price: f64,
    pub fundamentals: FundamentalsSummary,
    pub technicals: TechnicalSummary,
    pub news: NewsSummary,
    pub industry: Option<String>,
    /// Prior forecasts for this instrument, newest first. Empty when the
    /// history store has nothing (or is unavailable).
    pub history: Vec<ForecastHistoryEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsSummary {
    pub revenue_growth: Option<f64>,
    pub profit_margin: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub market_cap: Option<f64>,
}

impl FundamentalsSummary {
    pub fn is_empty(&self) -> bool {
        self.revenue_growth.is_none()
            && self.profit_margin.is_none()
            && self.pe_ratio.is_none()
            && self.market_cap.is_none()
    }

    /// Qualitative market-cap tier used in narrative and prompt text.
    pub fn cap_tier(&self) -> Option<&'static str> {
        let cap = self.market_cap?;
        Some(match cap {
            c if c >= 200e9 => "mega-cap",
            c if c >= 10e9 => "large-cap",
            c if c >= 2e9 => "mid-cap",
            c if c >= 300e6 => "small-cap",
            _ => "micro-cap",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalSummary {
    pub price: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub year_high: Option<f64>,
    pub year_low: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_200: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSummary {
    /// Up to 5 recent headlines.
    pub headlines: Vec<String>,
    pub sentiment: NewsSentiment,
    pub article_count: usize,
}

impl Default for NewsSummary {
    fn default() -> Self {
        Self {
            headlines: Vec::new(),
            sentiment: NewsSentiment::Neutral,
            article_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsSentiment {
    Positive,
    Neutral,
    Negative,
}

impl NewsSentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            NewsSentiment::Positive => "positive",
            NewsSentiment::Neutral => "neutral",
            NewsSentiment::Negative => "negative",
        }
    }
}

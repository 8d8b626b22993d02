use crate::domain::prediction::Horizon;
use serde::{Deserialize, Serialize};

/// Loose contract for what the generative model is asked to emit. Everything
/// except the four horizon prices is optional; the engine normalizes the rest.
/// Unknown extra keys are tolerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelForecast {
    pub predicted_price: ModelPredictedPrice,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<f64>,
    #[serde(default)]
    pub key_drivers: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPredictedPrice {
    pub one_month: f64,
    pub three_months: f64,
    pub six_months: f64,
    pub one_year: f64,
}

impl ModelPredictedPrice {
    pub fn get(&self, horizon: Horizon) -> f64 {
        match horizon {
            Horizon::OneMonth => self.one_month,
            Horizon::ThreeMonths => self.three_months,
            Horizon::SixMonths => self.six_months,
            Horizon::OneYear => self.one_year,
        }
    }
}

/// Echo threshold per horizon: a price closer to the current price than this
/// is treated as a non-answer for that horizon, not a flat forecast.
pub fn echo_threshold(horizon: Horizon) -> f64 {
    match horizon {
        Horizon::OneYear => 0.01,
        _ => 0.005,
    }
}

/// Outcome of gating a decoded forecast against the current price.
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    /// Structurally sound and every horizon clears its echo threshold.
    Pass,
    /// Structurally sound, but the named horizons sit inside their echo
    /// thresholds. The raw forecast is still usable; the blender's
    /// minimum-difference stage repairs exactly these horizons.
    BelowMargin { horizons: Vec<Horizon> },
    /// Unusable: some horizon price is non-finite or non-positive.
    Rejected { reason: String },
}

impl ModelForecast {
    /// Validation gate over the four horizon prices.
    pub fn gate(&self, current_price: f64) -> GateVerdict {
        let mut below = Vec::new();
        for horizon in Horizon::ALL {
            let price = self.predicted_price.get(horizon);
            if !price.is_finite() || price <= 0.0 {
                return GateVerdict::Rejected {
                    reason: format!("{horizon} price is not a positive number (got {price})"),
                };
            }
            let diff = (price - current_price).abs() / current_price;
            if diff < echo_threshold(horizon) {
                below.push(horizon);
            }
        }

        if below.is_empty() {
            GateVerdict::Pass
        } else {
            GateVerdict::BelowMargin { horizons: below }
        }
    }
}

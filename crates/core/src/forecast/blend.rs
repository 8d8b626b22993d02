use rand::Rng;

use crate::domain::contract::ModelPredictedPrice;
use crate::domain::prediction::{ForecastHistoryEntry, Horizon, PredictedPrice};
use crate::forecast::horizons;
use crate::forecast::industry::BoundTable;

/// How tightly past one-year forecasts for this symbol agree with each other,
/// measured as the standard deviation of their implied trends in percentage
/// points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    High,
    Medium,
    Low,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::High => "high",
            Consistency::Medium => "medium",
            Consistency::Low => "low",
        }
    }

    fn from_stddev_pts(pts: f64) -> Self {
        if pts < 5.0 {
            Consistency::High
        } else if pts < 15.0 {
            Consistency::Medium
        } else {
            Consistency::Low
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlendOutcome {
    pub prices: PredictedPrice,
    /// Present only when there is at least one history entry.
    pub consistency: Option<Consistency>,
    /// Weighted one-year historical trend, 0.0 without history. The analyst
    /// enhancer reuses it to bias any re-perturbation it triggers.
    pub hist_trend_one_year: f64,
}

/// Recency-weighted average of the implied trends in past forecasts for one
/// horizon. `history` is ordered newest first; entry `i` of `n` carries weight
/// `(n - i) / n`, so the newest entry counts fully and the oldest barely.
pub fn weighted_history_trend(
    history: &[ForecastHistoryEntry],
    horizon: Horizon,
) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let n = history.len() as f64;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (i, entry) in history.iter().enumerate() {
        let weight = (n - i as f64) / n;
        weighted_sum += weight * entry.trend(horizon);
        weight_total += weight;
    }
    Some(weighted_sum / weight_total)
}

/// Push a price that sits too close to the current price out past the
/// horizon's minimum margin. Magnitude is uniform in `[margin, 2*margin)`;
/// direction is a biased coin, 60% toward the side of the historical trend
/// (upward on a flat or missing trend).
pub fn enforce_min_margin<R: Rng>(
    price: f64,
    current_price: f64,
    horizon: Horizon,
    hist_trend: f64,
    rng: &mut R,
) -> f64 {
    let margin = horizons::spec(horizon).min_margin;
    let ratio = (price - current_price).abs() / current_price;
    if ratio >= margin {
        return price;
    }
    let amount = rng.gen_range(margin..margin * 2.0);
    let upward = rng.gen_bool(if hist_trend >= 0.0 { 0.6 } else { 0.4 });
    if upward {
        current_price * (1.0 + amount)
    } else {
        current_price * (1.0 - amount)
    }
}

/// Reconcile a raw model forecast (if any) with this symbol's forecast
/// history, then enforce minimum margins and clamp into the industry bound
/// table. Clamping is the last step that touches a price.
///
/// With history, each horizon blends `history_weight` of the weighted
/// historical trend with the remainder of the model's trend (zero when the
/// model gave nothing). Without history the model's trend passes straight
/// through.
pub fn blend<R: Rng>(
    raw: Option<&ModelPredictedPrice>,
    current_price: f64,
    bounds: &BoundTable,
    history: &[ForecastHistoryEntry],
    rng: &mut R,
) -> BlendOutcome {
    let mut prices = PredictedPrice::uniform(current_price);

    for horizon in Horizon::ALL {
        let hist_trend = weighted_history_trend(history, horizon);
        let raw_trend = raw.map(|r| r.get(horizon) / current_price - 1.0);

        let blended_trend = match (hist_trend, raw_trend) {
            (Some(hist), raw) => {
                let weight = horizons::spec(horizon).history_weight;
                weight * hist + (1.0 - weight) * raw.unwrap_or(0.0)
            }
            (None, Some(raw)) => raw,
            (None, None) => 0.0,
        };

        let candidate = current_price * (1.0 + blended_trend);
        let margined = enforce_min_margin(
            candidate,
            current_price,
            horizon,
            hist_trend.unwrap_or(0.0),
            rng,
        );
        *prices.get_mut(horizon) = bounds.clamp(horizon, current_price, margined);
    }

    BlendOutcome {
        prices,
        consistency: one_year_consistency(history),
        hist_trend_one_year: weighted_history_trend(history, Horizon::OneYear).unwrap_or(0.0),
    }
}

fn one_year_consistency(history: &[ForecastHistoryEntry]) -> Option<Consistency> {
    if history.is_empty() {
        return None;
    }
    let trends: Vec<f64> = history
        .iter()
        .map(|entry| entry.trend(Horizon::OneYear) * 100.0)
        .collect();
    let mean = trends.iter().sum::<f64>() / trends.len() as f64;
    let variance = trends
        .iter()
        .map(|t| (t - mean) * (t - mean))
        .sum::<f64>()
        / trends.len() as f64;
    Some(Consistency::from_stddev_pts(variance.sqrt()))
}

use crate::domain::prediction::{Horizon, PredictedPrice, StockPrediction};
use crate::forecast::horizons;
use crate::forecast::industry::IndustryProfile;

pub const FALLBACK_CONFIDENCE: f64 = 75.0;

pub const GENERIC_DRIVERS: &[&str] = &[
    "Prevailing sector momentum",
    "Reversion toward recent trading ranges",
    "Broad equity market direction",
    "Liquidity and fund-flow conditions",
];

pub const GENERIC_RISKS: &[&str] = &[
    "General market volatility",
    "Macroeconomic policy shifts",
    "Sector rotation away from the industry",
    "Company-specific execution surprises",
];

/// Conservative forecast used when there is neither a model forecast nor any
/// usable history. Total and deterministic: no clock, no randomness, so the
/// same inputs always produce the same prediction.
pub fn fallback_prediction(
    symbol: &str,
    current_price: f64,
    profile: &IndustryProfile,
) -> StockPrediction {
    let drift = |h: Horizon| current_price * (1.0 + horizons::spec(h).fallback_drift);

    StockPrediction {
        symbol: symbol.to_string(),
        current_price,
        predicted_price: PredictedPrice {
            one_month: drift(Horizon::OneMonth),
            three_months: drift(Horizon::ThreeMonths),
            six_months: drift(Horizon::SixMonths),
            one_year: drift(Horizon::OneYear),
        },
        sentiment: format!(
            "Neutral outlook based on a conservative drift profile. {}",
            profile.growth_note
        ),
        confidence_level: FALLBACK_CONFIDENCE,
        key_drivers: GENERIC_DRIVERS.iter().map(|s| s.to_string()).collect(),
        risks: GENERIC_RISKS.iter().map(|s| s.to_string()).collect(),
        analyst_data: None,
        market_sentiment: None,
        fundamentals: None,
        upcoming_catalysts: None,
        earnings_data: None,
    }
}

/// Pad a normalized list up to at least 3 entries with generic fill, and cap
/// it at 5. Blank entries are dropped first.
pub fn normalize_list(items: Vec<String>, fill: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    out.truncate(5);

    let mut fill_iter = fill.iter();
    while out.len() < 3 {
        match fill_iter.next() {
            Some(f) if out.iter().any(|s| s.as_str() == *f) => continue,
            Some(f) => out.push(f.to_string()),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::industry;

    #[test]
    fn fallback_is_idempotent() {
        let profile = industry::lookup(None);
        let a = fallback_prediction("AAPL", 187.32, profile);
        let b = fallback_prediction("AAPL", 187.32, profile);
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_applies_fixed_drifts() {
        let profile = industry::lookup(None);
        let p = fallback_prediction("TEST", 100.0, profile);
        assert!((p.predicted_price.one_month - 101.0).abs() < 1e-9);
        assert!((p.predicted_price.three_months - 103.0).abs() < 1e-9);
        assert!((p.predicted_price.six_months - 105.0).abs() < 1e-9);
        assert!((p.predicted_price.one_year - 108.0).abs() < 1e-9);
        assert_eq!(p.confidence_level, 75.0);
        assert_eq!(p.key_drivers.len(), 4);
        assert_eq!(p.risks.len(), 4);
    }

    #[test]
    fn fallback_respects_margin_and_bounds_invariants() {
        let profile = industry::lookup(Some("utilities"));
        let p = fallback_prediction("SO", 71.5, profile);
        for horizon in Horizon::ALL {
            let price = p.predicted_price.get(horizon);
            let ratio = (price - p.current_price).abs() / p.current_price;
            assert!(price > 0.0);
            assert!(ratio + 1e-12 >= crate::forecast::horizons::spec(horizon).min_margin);
            assert!(ratio <= profile.bounds.get(horizon) + 1e-12);
        }
    }

    #[test]
    fn normalize_list_pads_and_caps() {
        let out = normalize_list(vec!["only one".into()], GENERIC_DRIVERS);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "only one");

        let out = normalize_list(
            (0..8).map(|i| format!("driver {i}")).collect(),
            GENERIC_DRIVERS,
        );
        assert_eq!(out.len(), 5);

        let out = normalize_list(vec!["  ".into(), "real".into()], GENERIC_RISKS);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "real");
    }
}

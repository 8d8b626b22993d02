use crate::domain::prediction::Horizon;

/// Per-horizon tuning, kept in one place instead of scattered constants.
#[derive(Debug, Clone, Copy)]
pub struct HorizonSpec {
    /// Minimum fractional distance from the current price the final forecast
    /// must keep for this horizon.
    pub min_margin: f64,
    /// Blend weight toward the historical trend when history exists.
    pub history_weight: f64,
    /// Fixed drift applied by the deterministic fallback generator.
    pub fallback_drift: f64,
}

pub const fn spec(horizon: Horizon) -> HorizonSpec {
    match horizon {
        Horizon::OneMonth => HorizonSpec {
            min_margin: 0.010,
            history_weight: 0.7,
            fallback_drift: 0.01,
        },
        Horizon::ThreeMonths => HorizonSpec {
            min_margin: 0.015,
            history_weight: 0.7,
            fallback_drift: 0.03,
        },
        Horizon::SixMonths => HorizonSpec {
            min_margin: 0.020,
            history_weight: 0.7,
            fallback_drift: 0.05,
        },
        Horizon::OneYear => HorizonSpec {
            min_margin: 0.025,
            history_weight: 0.7,
            fallback_drift: 0.08,
        },
    }
}

//! Post-processors that fold secondary provider signals into a finished
//! prediction. Each one is a no-op when its signal is absent or degenerate,
//! so the engine can apply whatever subset the provider returned.

use chrono::NaiveDate;
use rand::Rng;

use crate::domain::prediction::{
    AnalystData, EarningsData, FundamentalsData, Horizon, MarketSentimentData, StockPrediction,
};
use crate::forecast::blend;
use crate::forecast::industry::BoundTable;
use crate::ingest::types::{
    AnalystEstimates, EarningsEvent, EnterpriseValue, RecommendationTrends,
};

/// Re-blend the one-year price 50/50 with the price implied by forward EPS
/// growth, then re-apply the margin and bound rules. The industry ceiling
/// binds this component like any other.
pub fn apply_analyst_estimates<R: Rng>(
    prediction: &mut StockPrediction,
    estimates: &AnalystEstimates,
    bounds: &BoundTable,
    hist_trend_one_year: f64,
    rng: &mut R,
) {
    let (eps_this, eps_next) = match (estimates.eps_this_year, estimates.eps_next_year) {
        (Some(this), Some(next)) => (this, next),
        _ => return,
    };
    let growth = (eps_next - eps_this) / eps_this.abs();
    if !growth.is_finite() {
        return;
    }

    let current = prediction.current_price;
    let implied = current * (1.0 + growth);
    let reblended = 0.5 * prediction.predicted_price.one_year + 0.5 * implied;
    let margined = blend::enforce_min_margin(
        reblended,
        current,
        Horizon::OneYear,
        hist_trend_one_year,
        rng,
    );
    prediction.predicted_price.one_year = bounds.clamp(Horizon::OneYear, current, margined);

    prediction.analyst_data = Some(AnalystData {
        eps_this_year: eps_this,
        eps_next_year: eps_next,
        implied_growth: growth,
        implied_one_year_price: implied,
        analyst_count: estimates.analyst_count,
    });
}

/// Score aggregated recommendation counts on a [-2, +2] scale and nudge the
/// confidence level by up to ten points in the score's direction.
pub fn apply_recommendation_trend(
    prediction: &mut StockPrediction,
    trends: &RecommendationTrends,
) {
    let total = trends.total();
    if total <= 0 {
        return;
    }
    let score = (2 * trends.strong_buy + trends.buy - trends.sell - 2 * trends.strong_sell)
        as f64
        / total as f64;
    let adjustment = (score * 5.0).clamp(-10.0, 10.0);
    prediction.confidence_level = (prediction.confidence_level + adjustment).clamp(0.0, 100.0);

    let label = if score >= 0.5 {
        "bullish"
    } else if score <= -0.5 {
        "bearish"
    } else {
        "mixed"
    };
    prediction.market_sentiment = Some(MarketSentimentData {
        score,
        label: label.to_string(),
        strong_buy: trends.strong_buy,
        buy: trends.buy,
        hold: trends.hold,
        sell: trends.sell,
        strong_sell: trends.strong_sell,
    });
}

/// Attach enterprise-value figures as display-only annotations. Never touches
/// a price.
pub fn apply_enterprise_value(prediction: &mut StockPrediction, ev: &EnterpriseValue) {
    let enterprise_value = match ev.enterprise_value {
        Some(value) if value > 0.0 => value,
        _ => return,
    };
    let ev_to_market_cap = ev
        .market_cap
        .filter(|mc| *mc > 0.0)
        .map(|mc| enterprise_value / mc);
    prediction.fundamentals = Some(FundamentalsData {
        enterprise_value,
        ev_to_market_cap,
        total_debt: ev.total_debt,
        cash: ev.cash,
    });
}

/// Surface the nearest upcoming earnings date as a catalyst, and the most
/// recent reported one as actual-vs-estimate figures.
pub fn apply_earnings_calendar(
    prediction: &mut StockPrediction,
    events: &[EarningsEvent],
    today: NaiveDate,
) {
    let upcoming = events
        .iter()
        .filter(|e| e.date >= today)
        .min_by_key(|e| e.date);
    if let Some(event) = upcoming {
        prediction
            .upcoming_catalysts
            .get_or_insert_with(Vec::new)
            .push(format!("Earnings report scheduled for {}", event.date));
    }

    let reported = events
        .iter()
        .filter(|e| e.date < today && e.eps_actual.is_some())
        .max_by_key(|e| e.date);
    if let Some(event) = reported {
        let eps_surprise_pct = match (event.eps_actual, event.eps_estimate) {
            (Some(actual), Some(estimate)) if estimate != 0.0 => {
                Some((actual - estimate) / estimate.abs() * 100.0)
            }
            _ => None,
        };
        prediction.earnings_data = Some(EarningsData {
            report_date: event.date,
            eps_actual: event.eps_actual,
            eps_estimate: event.eps_estimate,
            revenue_actual: event.revenue_actual,
            revenue_estimate: event.revenue_estimate,
            eps_surprise_pct,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::PredictedPrice;
    use crate::forecast::industry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn base_prediction() -> StockPrediction {
        StockPrediction {
            symbol: "TEST".to_string(),
            current_price: 100.0,
            predicted_price: PredictedPrice {
                one_month: 101.5,
                three_months: 103.0,
                six_months: 105.0,
                one_year: 112.0,
            },
            sentiment: "neutral".to_string(),
            confidence_level: 70.0,
            key_drivers: vec!["a".into(), "b".into(), "c".into()],
            risks: vec!["x".into(), "y".into(), "z".into()],
            analyst_data: None,
            market_sentiment: None,
            fundamentals: None,
            upcoming_catalysts: None,
            earnings_data: None,
        }
    }

    #[test]
    fn analyst_estimates_reblend_the_one_year_price() {
        let mut prediction = base_prediction();
        let estimates = AnalystEstimates {
            eps_this_year: Some(5.0),
            eps_next_year: Some(6.0),
            analyst_count: Some(12),
        };
        let bounds = &industry::lookup(None).bounds;
        let mut rng = StdRng::seed_from_u64(11);
        apply_analyst_estimates(&mut prediction, &estimates, bounds, 0.0, &mut rng);

        // Implied price 120, reblended 50/50 with 112.
        assert!((prediction.predicted_price.one_year - 116.0).abs() < 1e-9);
        let data = prediction.analyst_data.expect("analyst data attached");
        assert!((data.implied_growth - 0.2).abs() < 1e-9);
        assert!((data.implied_one_year_price - 120.0).abs() < 1e-9);
        assert_eq!(data.analyst_count, Some(12));
    }

    #[test]
    fn analyst_estimates_handle_negative_trailing_eps() {
        let mut prediction = base_prediction();
        let estimates = AnalystEstimates {
            eps_this_year: Some(-2.0),
            eps_next_year: Some(1.0),
            analyst_count: None,
        };
        let bounds = &industry::lookup(None).bounds;
        let mut rng = StdRng::seed_from_u64(11);
        apply_analyst_estimates(&mut prediction, &estimates, bounds, 0.0, &mut rng);

        // Growth (1 - (-2)) / |-2| = 1.5, implied 250, reblended 181, capped
        // by the default one-year bound at 150.
        assert!((prediction.predicted_price.one_year - 150.0).abs() < 1e-9);
        let data = prediction.analyst_data.expect("analyst data attached");
        assert!((data.implied_growth - 1.5).abs() < 1e-9);
    }

    #[test]
    fn analyst_estimates_without_both_eps_values_are_ignored() {
        let mut prediction = base_prediction();
        let estimates = AnalystEstimates {
            eps_this_year: Some(5.0),
            eps_next_year: None,
            analyst_count: Some(4),
        };
        let bounds = &industry::lookup(None).bounds;
        let mut rng = StdRng::seed_from_u64(11);
        apply_analyst_estimates(&mut prediction, &estimates, bounds, 0.0, &mut rng);

        assert!((prediction.predicted_price.one_year - 112.0).abs() < 1e-12);
        assert!(prediction.analyst_data.is_none());
    }

    #[test]
    fn analyst_estimates_with_zero_trailing_eps_are_ignored() {
        let mut prediction = base_prediction();
        let estimates = AnalystEstimates {
            eps_this_year: Some(0.0),
            eps_next_year: Some(3.0),
            analyst_count: None,
        };
        let bounds = &industry::lookup(None).bounds;
        let mut rng = StdRng::seed_from_u64(11);
        apply_analyst_estimates(&mut prediction, &estimates, bounds, 0.0, &mut rng);
        assert!(prediction.analyst_data.is_none());
    }

    #[test]
    fn analyst_reblend_stays_under_the_industry_ceiling() {
        let mut prediction = base_prediction();
        prediction.current_price = 50.0;
        prediction.predicted_price.one_year = 80.0;
        let estimates = AnalystEstimates {
            eps_this_year: Some(1.0),
            eps_next_year: Some(3.0),
            analyst_count: Some(6),
        };
        let profile = industry::lookup(Some("Technology"));
        let mut rng = StdRng::seed_from_u64(11);
        apply_analyst_estimates(&mut prediction, &estimates, &profile.bounds, 0.0, &mut rng);

        // Implied 150, reblended 115, clamped back to 50 * 1.6.
        assert_eq!(prediction.predicted_price.one_year, 80.0);
    }

    #[test]
    fn strongly_bullish_counts_raise_confidence_by_nine() {
        let mut prediction = base_prediction();
        let trends = RecommendationTrends {
            strong_buy: 8,
            buy: 2,
            hold: 0,
            sell: 0,
            strong_sell: 0,
        };
        apply_recommendation_trend(&mut prediction, &trends);

        let sentiment = prediction.market_sentiment.expect("sentiment attached");
        assert!((sentiment.score - 1.8).abs() < 1e-12);
        assert_eq!(sentiment.label, "bullish");
        assert!((prediction.confidence_level - 79.0).abs() < 1e-9);
    }

    #[test]
    fn bearish_counts_lower_confidence() {
        let mut prediction = base_prediction();
        let trends = RecommendationTrends {
            strong_buy: 0,
            buy: 0,
            hold: 0,
            sell: 2,
            strong_sell: 8,
        };
        apply_recommendation_trend(&mut prediction, &trends);

        let sentiment = prediction.market_sentiment.expect("sentiment attached");
        assert!((sentiment.score + 1.8).abs() < 1e-12);
        assert_eq!(sentiment.label, "bearish");
        assert!((prediction.confidence_level - 61.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_nudge_is_capped_and_clamped() {
        let mut prediction = base_prediction();
        prediction.confidence_level = 95.0;
        let trends = RecommendationTrends {
            strong_buy: 100,
            buy: 0,
            hold: 0,
            sell: 0,
            strong_sell: 0,
        };
        apply_recommendation_trend(&mut prediction, &trends);
        assert_eq!(prediction.confidence_level, 100.0);
        assert_eq!(prediction.market_sentiment.unwrap().score, 2.0);
    }

    #[test]
    fn all_hold_counts_are_mixed_and_leave_confidence_alone() {
        let mut prediction = base_prediction();
        let trends = RecommendationTrends {
            strong_buy: 0,
            buy: 0,
            hold: 10,
            sell: 0,
            strong_sell: 0,
        };
        apply_recommendation_trend(&mut prediction, &trends);
        let sentiment = prediction.market_sentiment.expect("sentiment attached");
        assert_eq!(sentiment.score, 0.0);
        assert_eq!(sentiment.label, "mixed");
        assert_eq!(prediction.confidence_level, 70.0);
    }

    #[test]
    fn empty_recommendation_counts_are_a_no_op() {
        let mut prediction = base_prediction();
        apply_recommendation_trend(&mut prediction, &RecommendationTrends::default());
        assert!(prediction.market_sentiment.is_none());
        assert_eq!(prediction.confidence_level, 70.0);
    }

    #[test]
    fn enterprise_value_is_attached_without_touching_prices() {
        let mut prediction = base_prediction();
        let before = prediction.predicted_price.clone();
        let ev = EnterpriseValue {
            enterprise_value: Some(1.2e9),
            market_cap: Some(1.0e9),
            total_debt: Some(3.0e8),
            cash: Some(1.0e8),
        };
        apply_enterprise_value(&mut prediction, &ev);

        assert_eq!(prediction.predicted_price, before);
        let fundamentals = prediction.fundamentals.expect("fundamentals attached");
        assert!((fundamentals.ev_to_market_cap.unwrap() - 1.2).abs() < 1e-9);
        assert_eq!(fundamentals.total_debt, Some(3.0e8));
    }

    #[test]
    fn non_positive_enterprise_value_is_ignored() {
        let mut prediction = base_prediction();
        apply_enterprise_value(&mut prediction, &EnterpriseValue::default());
        assert!(prediction.fundamentals.is_none());

        let ev = EnterpriseValue {
            enterprise_value: Some(-5.0),
            ..Default::default()
        };
        apply_enterprise_value(&mut prediction, &ev);
        assert!(prediction.fundamentals.is_none());
    }

    #[test]
    fn earnings_calendar_adds_catalyst_and_surprise_figures() {
        let mut prediction = base_prediction();
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let events = vec![
            EarningsEvent {
                date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
                eps_actual: Some(2.1),
                eps_estimate: Some(2.0),
                revenue_actual: Some(9.1e9),
                revenue_estimate: Some(9.0e9),
            },
            EarningsEvent {
                date: NaiveDate::from_ymd_opt(2025, 8, 12).unwrap(),
                eps_actual: None,
                eps_estimate: Some(2.2),
                revenue_actual: None,
                revenue_estimate: Some(9.4e9),
            },
        ];
        apply_earnings_calendar(&mut prediction, &events, today);

        let catalysts = prediction.upcoming_catalysts.expect("catalyst attached");
        assert_eq!(catalysts, vec!["Earnings report scheduled for 2025-08-12"]);

        let earnings = prediction.earnings_data.expect("earnings attached");
        assert_eq!(
            earnings.report_date,
            NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()
        );
        assert!((earnings.eps_surprise_pct.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn past_events_without_actuals_are_skipped() {
        let mut prediction = base_prediction();
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let events = vec![
            EarningsEvent {
                date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
                eps_actual: None,
                eps_estimate: Some(2.0),
                revenue_actual: None,
                revenue_estimate: None,
            },
            EarningsEvent {
                date: NaiveDate::from_ymd_opt(2025, 2, 8).unwrap(),
                eps_actual: Some(1.9),
                eps_estimate: Some(2.0),
                revenue_actual: None,
                revenue_estimate: None,
            },
        ];
        apply_earnings_calendar(&mut prediction, &events, today);

        assert!(prediction.upcoming_catalysts.is_none());
        let earnings = prediction.earnings_data.expect("earnings attached");
        assert_eq!(
            earnings.report_date,
            NaiveDate::from_ymd_opt(2025, 2, 8).unwrap()
        );
        assert!((earnings.eps_surprise_pct.unwrap() + 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_calendar_is_a_no_op() {
        let mut prediction = base_prediction();
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        apply_earnings_calendar(&mut prediction, &[], today);
        assert!(prediction.upcoming_catalysts.is_none());
        assert!(prediction.earnings_data.is_none());
    }
}

use crate::domain::prediction::Horizon;

/// Maximum fractional deviation from the current price allowed per horizon,
/// in either direction. This table is the hard ceiling and floor for every
/// component downstream of it; nothing may emit a price outside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundTable {
    pub one_month: f64,
    pub three_months: f64,
    pub six_months: f64,
    pub one_year: f64,
}

impl BoundTable {
    pub fn get(&self, horizon: Horizon) -> f64 {
        match horizon {
            Horizon::OneMonth => self.one_month,
            Horizon::ThreeMonths => self.three_months,
            Horizon::SixMonths => self.six_months,
            Horizon::OneYear => self.one_year,
        }
    }

    /// Clamp a horizon price into `[current × (1 − bound), current × (1 + bound)]`.
    pub fn clamp(&self, horizon: Horizon, current_price: f64, price: f64) -> f64 {
        let bound = self.get(horizon);
        let low = current_price * (1.0 - bound);
        let high = current_price * (1.0 + bound);
        price.clamp(low, high)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndustryProfile {
    pub name: &'static str,
    /// One sentence of growth character, used only in narrative/prompt text.
    pub growth_note: &'static str,
    pub bounds: BoundTable,
}

const DEFAULT_PROFILE: IndustryProfile = IndustryProfile {
    name: "general",
    growth_note: "Diversified businesses tend to track broad-market growth with moderate cyclicality.",
    bounds: BoundTable {
        one_month: 0.10,
        three_months: 0.20,
        six_months: 0.35,
        one_year: 0.50,
    },
};

const PROFILES: &[(&[&str], IndustryProfile)] = &[
    (
        &["software", "technology", "semiconductor", "electronics", "internet", "it services", "computer"],
        IndustryProfile {
            name: "technology",
            growth_note: "Technology companies can compound quickly but reprice sharply on growth revisions.",
            bounds: BoundTable {
                one_month: 0.15,
                three_months: 0.25,
                six_months: 0.40,
                one_year: 0.60,
            },
        },
    ),
    (
        &["biotech", "pharmaceutical", "drug", "life sciences"],
        IndustryProfile {
            name: "biotechnology",
            growth_note: "Clinical and regulatory catalysts make biotech outcomes unusually binary and volatile.",
            bounds: BoundTable {
                one_month: 0.18,
                three_months: 0.30,
                six_months: 0.50,
                one_year: 0.80,
            },
        },
    ),
    (
        &["health", "medical", "hospital", "diagnostics"],
        IndustryProfile {
            name: "healthcare",
            growth_note: "Healthcare demand is structurally stable while reimbursement policy drives repricings.",
            bounds: BoundTable {
                one_month: 0.10,
                three_months: 0.18,
                six_months: 0.30,
                one_year: 0.45,
            },
        },
    ),
    (
        &["bank", "financial", "insurance", "capital markets", "asset management", "credit"],
        IndustryProfile {
            name: "financial services",
            growth_note: "Financials track credit cycles and rate expectations more than idiosyncratic growth.",
            bounds: BoundTable {
                one_month: 0.08,
                three_months: 0.15,
                six_months: 0.25,
                one_year: 0.40,
            },
        },
    ),
    (
        &["oil", "gas", "energy", "petroleum", "coal", "drilling"],
        IndustryProfile {
            name: "energy",
            growth_note: "Energy earnings swing with commodity prices, keeping valuations cyclical.",
            bounds: BoundTable {
                one_month: 0.12,
                three_months: 0.22,
                six_months: 0.38,
                one_year: 0.55,
            },
        },
    ),
    (
        &["utility", "utilities", "electric", "water", "power generation"],
        IndustryProfile {
            name: "utilities",
            growth_note: "Regulated utilities grow slowly and trade in narrow, yield-driven ranges.",
            bounds: BoundTable {
                one_month: 0.06,
                three_months: 0.12,
                six_months: 0.20,
                one_year: 0.30,
            },
        },
    ),
    (
        &["consumer defensive", "staples", "beverages", "food", "household", "grocery", "tobacco"],
        IndustryProfile {
            name: "consumer defensive",
            growth_note: "Staples demand barely moves with the cycle, anchoring both growth and drawdowns.",
            bounds: BoundTable {
                one_month: 0.07,
                three_months: 0.13,
                six_months: 0.22,
                one_year: 0.32,
            },
        },
    ),
    (
        &["consumer cyclical", "retail", "apparel", "automobile", "auto", "restaurant", "travel", "leisure"],
        IndustryProfile {
            name: "consumer cyclical",
            growth_note: "Discretionary names amplify the consumer cycle in both directions.",
            bounds: BoundTable {
                one_month: 0.12,
                three_months: 0.20,
                six_months: 0.32,
                one_year: 0.48,
            },
        },
    ),
    (
        &["industrial", "machinery", "aerospace", "defense", "construction", "engineering"],
        IndustryProfile {
            name: "industrials",
            growth_note: "Industrials follow capex cycles with order books smoothing quarter-to-quarter noise.",
            bounds: BoundTable {
                one_month: 0.08,
                three_months: 0.16,
                six_months: 0.28,
                one_year: 0.42,
            },
        },
    ),
    (
        &["real estate", "reit", "property"],
        IndustryProfile {
            name: "real estate",
            growth_note: "Property values and REIT payouts move slowly, tied to rates and occupancy.",
            bounds: BoundTable {
                one_month: 0.07,
                three_months: 0.14,
                six_months: 0.24,
                one_year: 0.35,
            },
        },
    ),
    (
        &["communication", "telecom", "media", "entertainment", "broadcasting"],
        IndustryProfile {
            name: "communication services",
            growth_note: "Communication services mix utility-like subscriptions with hit-driven media swings.",
            bounds: BoundTable {
                one_month: 0.12,
                three_months: 0.20,
                six_months: 0.35,
                one_year: 0.50,
            },
        },
    ),
    (
        &["crypto", "blockchain", "bitcoin", "digital asset"],
        IndustryProfile {
            name: "crypto",
            growth_note: "Crypto-linked equities inherit the volatility of the underlying assets.",
            bounds: BoundTable {
                one_month: 0.25,
                three_months: 0.40,
                six_months: 0.60,
                one_year: 0.90,
            },
        },
    ),
];

/// Resolve a free-form industry label to a profile. Unknown or absent labels
/// get the conservative default table.
pub fn lookup(label: Option<&str>) -> &'static IndustryProfile {
    let Some(label) = label else {
        return &DEFAULT_PROFILE;
    };
    let needle = label.trim().to_lowercase();
    if needle.is_empty() {
        return &DEFAULT_PROFILE;
    }

    for (keywords, profile) in PROFILES {
        if keywords.iter().any(|k| needle.contains(k)) {
            return profile;
        }
    }
    &DEFAULT_PROFILE
}

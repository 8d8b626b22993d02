//! Prompt assembly for the generative forecast call. The system prompt pins
//! the JSON contract; the user prompt carries the per-request snapshot.

use crate::domain::analysis::AnalysisRecord;
use crate::domain::prediction::Horizon;
use crate::forecast::industry::IndustryProfile;
use crate::llm::Prompt;

pub fn build(record: &AnalysisRecord, profile: &IndustryProfile, quick: bool) -> Prompt {
    Prompt {
        system: system_prompt(),
        user: user_prompt(record, profile, quick),
    }
}

fn system_prompt() -> String {
    // Keep strict and provider-agnostic: JSON only, no prose.
    [
        "You are a price-forecast engine for listed equities.",
        "Return ONLY valid JSON. Do not wrap in markdown. Do not include any extra keys.",
        "No trailing commas. No comments. Use double quotes for all JSON strings.",
        "Output schema:",
        "{",
        "  \"predictedPrice\": {",
        "    \"oneMonth\": 0.0,",
        "    \"threeMonths\": 0.0,",
        "    \"sixMonths\": 0.0,",
        "    \"oneYear\": 0.0",
        "  },",
        "  \"sentiment\": \"one short paragraph\",",
        "  \"confidenceLevel\": 70,",
        "  \"keyDrivers\": [\"driver1\", \"driver2\", \"driver3\"],",
        "  \"risks\": [\"risk1\", \"risk2\", \"risk3\"]",
        "}",
        "Rules:",
        "- all four predictedPrice fields are required and must be positive numbers",
        "- never echo the current price: move oneMonth/threeMonths/sixMonths by at least 0.5% and oneYear by at least 1%",
        "- keyDrivers and risks must each have 3 to 5 short entries",
        "- confidenceLevel must be a number in [0, 100]",
    ]
    .join("\n")
}

fn user_prompt(record: &AnalysisRecord, profile: &IndustryProfile, quick: bool) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("Symbol: {}", record.symbol));
    lines.push(format!("Current price: {:.4}", record.current_price));
    lines.push(format!(
        "Industry: {} ({})",
        record.industry.as_deref().unwrap_or("unknown"),
        profile.growth_note
    ));

    lines.push("Price movement limits per horizon (stay inside them):".to_string());
    for horizon in Horizon::ALL {
        lines.push(format!(
            "- {}: within ±{:.0}% of current price",
            horizon.field_name(),
            profile.bounds.get(horizon) * 100.0
        ));
    }

    lines.push("Fundamentals:".to_string());
    lines.push(format!(
        "- revenue growth: {}",
        fmt_pct(record.fundamentals.revenue_growth)
    ));
    lines.push(format!(
        "- profit margin: {}",
        fmt_pct(record.fundamentals.profit_margin)
    ));
    lines.push(format!(
        "- P/E ratio: {}",
        fmt_num(record.fundamentals.pe_ratio)
    ));
    lines.push(format!(
        "- market cap: {}{}",
        fmt_cap(record.fundamentals.market_cap),
        record
            .fundamentals
            .cap_tier()
            .map(|tier| format!(" ({tier})"))
            .unwrap_or_default()
    ));

    if !quick {
        lines.push("Technicals:".to_string());
        lines.push(format!(
            "- 24h change: {}",
            fmt_pct_points(record.technicals.change_24h_pct)
        ));
        lines.push(format!(
            "- day range: {} - {}",
            fmt_num(record.technicals.day_low),
            fmt_num(record.technicals.day_high)
        ));
        lines.push(format!(
            "- 52w range: {} - {}",
            fmt_num(record.technicals.year_low),
            fmt_num(record.technicals.year_high)
        ));
        lines.push(format!(
            "- 50d/200d moving averages: {} / {}",
            fmt_num(record.technicals.ma_50),
            fmt_num(record.technicals.ma_200)
        ));

        lines.push(format!(
            "Recent news ({} articles, overall {}):",
            record.news.article_count,
            record.news.sentiment.as_str()
        ));
        if record.news.headlines.is_empty() {
            lines.push("- none".to_string());
        }
        for headline in &record.news.headlines {
            lines.push(format!("- {headline}"));
        }
    }

    lines.push(
        "Task: produce the forecast JSON for the four horizons now.".to_string(),
    );
    lines.join("\n")
}

fn fmt_num(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Fractional input (0.12 == 12%).
fn fmt_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Input already in percentage points.
fn fmt_pct_points(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}%"))
        .unwrap_or_else(|| "unknown".to_string())
}

fn fmt_cap(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 1e9 => format!("${:.1}B", v / 1e9),
        Some(v) if v >= 1e6 => format!("${:.1}M", v / 1e6),
        Some(v) => format!("${v:.0}"),
        None => "unknown".to_string(),
    }
}

//! Pure assembly of the per-request analysis snapshot. Never fails: malformed
//! or missing provider fields become `None`, never a default number.

use crate::domain::analysis::{
    AnalysisRecord, FundamentalsSummary, NewsSentiment, NewsSummary, TechnicalSummary,
};
use crate::domain::prediction::ForecastHistoryEntry;
use crate::ingest::types::{Article, FundamentalsRaw, Quote};

const MAX_HEADLINES: usize = 5;

const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "surge", "surges", "soar", "soars", "rally", "record", "upgrade",
    "upgraded", "growth", "strong", "profit", "gain", "gains", "bullish", "outperform",
    "raise", "raised", "jump", "jumps",
];

const NEGATIVE_WORDS: &[&str] = &[
    "miss", "misses", "plunge", "plunges", "fall", "falls", "drop", "drops", "downgrade",
    "downgraded", "weak", "loss", "losses", "lawsuit", "probe", "recall", "bearish", "cut",
    "cuts", "warning", "slump", "decline",
];

pub fn assemble(
    symbol: &str,
    current_price: f64,
    fundamentals: Option<FundamentalsRaw>,
    quote: Option<Quote>,
    articles: Vec<Article>,
    industry_override: Option<String>,
    history: Vec<ForecastHistoryEntry>,
) -> AnalysisRecord {
    let provider_industry = fundamentals.as_ref().and_then(|f| f.industry.clone());
    let industry = industry_override
        .filter(|s| !s.trim().is_empty())
        .or(provider_industry)
        .filter(|s| !s.trim().is_empty());

    AnalysisRecord {
        symbol: symbol.to_string(),
        current_price,
        fundamentals: summarize_fundamentals(fundamentals),
        technicals: summarize_quote(quote),
        news: summarize_news(&articles),
        industry,
        history,
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn summarize_fundamentals(raw: Option<FundamentalsRaw>) -> FundamentalsSummary {
    let raw = match raw {
        Some(raw) => raw,
        None => return FundamentalsSummary::default(),
    };
    FundamentalsSummary {
        revenue_growth: finite(raw.revenue_growth),
        profit_margin: finite(raw.profit_margin),
        pe_ratio: finite(raw.pe_ratio),
        market_cap: finite(raw.market_cap),
    }
}

fn summarize_quote(quote: Option<Quote>) -> TechnicalSummary {
    let quote = match quote {
        Some(quote) => quote,
        None => return TechnicalSummary::default(),
    };
    TechnicalSummary {
        price: finite(Some(quote.price)),
        change_24h_pct: finite(quote.change_pct),
        day_high: finite(quote.day_high),
        day_low: finite(quote.day_low),
        year_high: finite(quote.year_high),
        year_low: finite(quote.year_low),
        ma_50: finite(quote.ma_50),
        ma_200: finite(quote.ma_200),
        volume: finite(quote.volume),
    }
}

fn summarize_news(articles: &[Article]) -> NewsSummary {
    let headlines: Vec<String> = articles
        .iter()
        .map(|a| a.title.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_HEADLINES)
        .collect();

    NewsSummary {
        headlines,
        sentiment: score_headlines(articles),
        article_count: articles.len(),
    }
}

/// Crude keyword net score over all supplied headlines. Two or more net
/// positive hits reads positive, two or more net negative reads negative.
fn score_headlines(articles: &[Article]) -> NewsSentiment {
    let mut net: i64 = 0;
    for article in articles {
        for word in article.title.split_whitespace() {
            let token = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            if POSITIVE_WORDS.contains(&token.as_str()) {
                net += 1;
            } else if NEGATIVE_WORDS.contains(&token.as_str()) {
                net -= 1;
            }
        }
    }
    if net >= 2 {
        NewsSentiment::Positive
    } else if net <= -2 {
        NewsSentiment::Negative
    } else {
        NewsSentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str) -> Article {
        Article {
            title: title.to_string(),
            published_at: None,
            site: None,
        }
    }

    #[test]
    fn assembles_with_nothing_but_symbol_and_price() {
        let record = assemble("AAPL", 187.3, None, None, vec![], None, vec![]);
        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.current_price, 187.3);
        assert!(record.fundamentals.is_empty());
        assert!(record.technicals.price.is_none());
        assert_eq!(record.news.sentiment, NewsSentiment::Neutral);
        assert!(record.industry.is_none());
        assert!(record.history.is_empty());
    }

    #[test]
    fn non_finite_provider_numbers_become_unknown() {
        let raw = FundamentalsRaw {
            revenue_growth: Some(0.12),
            profit_margin: Some(f64::NAN),
            pe_ratio: Some(f64::INFINITY),
            market_cap: Some(2.5e12),
            industry: None,
        };
        let record = assemble("MSFT", 410.0, Some(raw), None, vec![], None, vec![]);
        assert_eq!(record.fundamentals.revenue_growth, Some(0.12));
        assert!(record.fundamentals.profit_margin.is_none());
        assert!(record.fundamentals.pe_ratio.is_none());
        assert_eq!(record.fundamentals.market_cap, Some(2.5e12));
    }

    #[test]
    fn headlines_are_capped_but_all_articles_are_counted() {
        let articles: Vec<Article> = (0..8)
            .map(|i| article(&format!("Quarterly update number {i}")))
            .collect();
        let record = assemble("NVDA", 120.0, None, None, articles, None, vec![]);
        assert_eq!(record.news.headlines.len(), 5);
        assert_eq!(record.news.article_count, 8);
    }

    #[test]
    fn positive_headlines_score_positive() {
        let articles = vec![
            article("Shares surge after earnings beat"),
            article("Analyst upgrade lifts outlook"),
        ];
        let record = assemble("AMD", 150.0, None, None, articles, None, vec![]);
        assert_eq!(record.news.sentiment, NewsSentiment::Positive);
    }

    #[test]
    fn mixed_headlines_can_still_net_negative() {
        // One positive hit (profit) against three negative ones.
        let articles = vec![
            article("Profit warning as sales plunge"),
            article("Regulator probe widens"),
        ];
        let record = assemble("BA", 180.0, None, None, articles, None, vec![]);
        assert_eq!(record.news.sentiment, NewsSentiment::Negative);
    }

    #[test]
    fn punctuation_does_not_hide_keywords() {
        let articles = vec![article("Stock soars, record quarter!")];
        let record = assemble("TSM", 160.0, None, None, articles, None, vec![]);
        assert_eq!(record.news.sentiment, NewsSentiment::Positive);
    }

    #[test]
    fn single_keyword_stays_neutral() {
        let articles = vec![article("Company schedules annual meeting amid growth")];
        let record = assemble("KO", 62.0, None, None, articles, None, vec![]);
        assert_eq!(record.news.sentiment, NewsSentiment::Neutral);
    }

    #[test]
    fn industry_override_wins_over_provider_label() {
        let raw = FundamentalsRaw {
            industry: Some("Technology".to_string()),
            ..Default::default()
        };
        let record = assemble(
            "X",
            10.0,
            Some(raw.clone()),
            None,
            vec![],
            Some("Healthcare".to_string()),
            vec![],
        );
        assert_eq!(record.industry.as_deref(), Some("Healthcare"));

        let record = assemble("X", 10.0, Some(raw.clone()), None, vec![], None, vec![]);
        assert_eq!(record.industry.as_deref(), Some("Technology"));

        let record = assemble(
            "X",
            10.0,
            Some(raw),
            None,
            vec![],
            Some("  ".to_string()),
            vec![],
        );
        assert_eq!(record.industry.as_deref(), Some("Technology"));
    }

    #[test]
    fn quote_fields_map_into_technicals() {
        let quote = Quote {
            symbol: "AAPL".to_string(),
            price: 187.3,
            change_pct: Some(1.2),
            day_high: Some(189.0),
            day_low: Some(185.5),
            year_high: Some(199.6),
            year_low: Some(124.2),
            ma_50: Some(182.1),
            ma_200: Some(171.8),
            volume: Some(f64::NAN),
            market_cap: Some(2.9e12),
        };
        let record = assemble("AAPL", 187.3, None, Some(quote), vec![], None, vec![]);
        assert_eq!(record.technicals.price, Some(187.3));
        assert_eq!(record.technicals.ma_200, Some(171.8));
        assert!(record.technicals.volume.is_none());
    }
}

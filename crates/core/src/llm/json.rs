use crate::domain::contract::ModelForecast;
use std::fmt;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Why a model reply failed to decode. The engine treats both variants the
/// same way (fallback seed), but they are logged separately because a schema
/// mismatch usually means the prompt drifted, not the model.
#[derive(Debug, Clone)]
pub enum DecodeError {
    Parse(String),
    Schema(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Parse(detail) => write!(f, "model reply was not JSON: {detail}"),
            DecodeError::Schema(detail) => {
                write!(f, "model reply did not match the forecast schema: {detail}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a model reply into the raw forecast contract: direct parse first,
/// then fence/brace extraction for replies that wrap the JSON in prose.
pub fn decode_forecast(text: &str) -> Result<ModelForecast, DecodeError> {
    if let Ok(forecast) = serde_json::from_str::<ModelForecast>(text.trim()) {
        return Ok(forecast);
    }

    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DecodeError::Parse(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| DecodeError::Schema(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast_json() -> String {
        json!({
            "predictedPrice": {
                "oneMonth": 105.0,
                "threeMonths": 110.0,
                "sixMonths": 118.0,
                "oneYear": 130.0
            },
            "sentiment": "Constructive on continued demand.",
            "confidenceLevel": 72,
            "keyDrivers": ["a", "b", "c"],
            "risks": ["x", "y", "z"]
        })
        .to_string()
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn decode_accepts_clean_json() {
        let forecast = decode_forecast(&forecast_json()).unwrap();
        assert_eq!(forecast.predicted_price.one_month, 105.0);
        assert_eq!(forecast.confidence_level, Some(72.0));
    }

    #[test]
    fn decode_accepts_fenced_json() {
        let fenced = format!("```json\n{}\n```", forecast_json());
        let forecast = decode_forecast(&fenced).unwrap();
        assert_eq!(forecast.predicted_price.one_year, 130.0);
    }

    #[test]
    fn decode_accepts_prose_wrapped_json() {
        let wrapped = format!(
            "Here is my forecast:\n{}\nLet me know if you need anything else.",
            forecast_json()
        );
        let forecast = decode_forecast(&wrapped).unwrap();
        assert_eq!(forecast.predicted_price.six_months, 118.0);
    }

    #[test]
    fn decode_tolerates_missing_optional_fields_and_extra_keys() {
        let minimal = json!({
            "predictedPrice": {
                "oneMonth": 105.0,
                "threeMonths": 110.0,
                "sixMonths": 118.0,
                "oneYear": 130.0
            },
            "rationaleSummary": "an extra key the contract ignores"
        })
        .to_string();
        let forecast = decode_forecast(&minimal).unwrap();
        assert!(forecast.sentiment.is_none());
        assert!(forecast.key_drivers.is_empty());
    }

    #[test]
    fn decode_tags_non_json_as_parse_error() {
        let err = decode_forecast("I cannot provide a forecast today.").unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)));
    }

    #[test]
    fn decode_tags_contract_mismatch_as_schema_error() {
        let missing_horizon = json!({
            "predictedPrice": {
                "oneMonth": 105.0,
                "threeMonths": 110.0,
                "oneYear": 130.0
            }
        })
        .to_string();
        let err = decode_forecast(&missing_horizon).unwrap_err();
        assert!(matches!(err, DecodeError::Schema(_)));
    }
}

use crate::config::Settings;
use crate::llm::error::GenerativeDiagnosticsError;
use crate::llm::{CompleteOptions, GenerativeClient, Prompt};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const PROVIDER: &str = "anthropic";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(GenerativeDiagnosticsError {
                provider: PROVIDER,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .with_context(|| format!("failed to decode Anthropic response: {text}"))
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. } => {
                    // Ignore.
                }
                ContentBlock::Unknown => {
                    // Ignore unknown blocks.
                }
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl GenerativeClient for AnthropicClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        options: &CompleteOptions,
    ) -> anyhow::Result<String> {
        let req = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: options.max_tokens,
            temperature: Some(options.temperature),
            system: Some(prompt.system.clone()),
            messages: vec![Message {
                role: "user",
                content: prompt.user.clone(),
            }],
        };

        let res = self.create_message(req).await?;

        // No retry on truncation; the caller's decode pass decides what a
        // partial reply is worth.
        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                model = %self.model,
                "Anthropic stop_reason=max_tokens; reply may be truncated"
            );
        }

        Ok(Self::response_text(&res))
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        #[serde(default)]
        data: String,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_joins_text_blocks_and_skips_thinking() {
        let res = CreateMessageResponse {
            content: vec![
                ContentBlock::Thinking {
                    thinking: "working it out".to_string(),
                    signature: String::new(),
                },
                ContentBlock::Text {
                    text: "{\"a\":".to_string(),
                },
                ContentBlock::Text {
                    text: "1}".to_string(),
                },
            ],
            stop_reason: Some("end_turn".to_string()),
        };
        assert_eq!(AnthropicClient::response_text(&res), "{\"a\":\n1}");
    }

    #[test]
    fn unknown_content_blocks_deserialize_without_error() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "server_tool_use", "id": "x", "name": "y"}
            ],
            "stop_reason": "end_turn"
        }"#;
        let res: CreateMessageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(AnthropicClient::response_text(&res), "hello");
    }
}

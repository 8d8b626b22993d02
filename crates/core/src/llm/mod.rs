pub mod anthropic;
pub mod error;
pub mod json;

/// A full request to the generative model, system instructions separated from
/// the per-request user content.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CompleteOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompleteOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

/// Text completion against a generative model. Implementations return the
/// raw text of the reply; decoding it into a forecast is the caller's
/// problem, because providers routinely wrap JSON in prose.
#[async_trait::async_trait]
pub trait GenerativeClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &Prompt, options: &CompleteOptions)
        -> anyhow::Result<String>;
}

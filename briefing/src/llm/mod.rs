use anyhow::Result;
use tracing::{debug, warn};

/// Core trait for text-generation providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a system + user prompt pair
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Model identifier sent with every request
    fn model(&self) -> &str;
}

/// Request structure for LLM generation
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Outcome of one generation call. Failures carry the reason so the caller
/// can pick its own fallback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    Failed(String),
}

impl Generation {
    pub fn is_failed(&self) -> bool {
        matches!(self, Generation::Failed(_))
    }

    /// Generated text, or `fallback` when the call failed.
    pub fn text_or(self, fallback: &str) -> String {
        match self {
            Generation::Text(text) => text,
            Generation::Failed(_) => fallback.to_string(),
        }
    }
}

pub mod remote;

/// Runs one generation call and folds every error into [`Generation::Failed`].
///
/// The response text is trimmed; a blank response counts as a failure.
pub async fn generate_text<P: LlmProvider + ?Sized>(provider: &P, request: LlmRequest) -> Generation {
    match provider.generate(request).await {
        Ok(response) => {
            debug!(
                model = %response.model,
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                "generation succeeded"
            );
            let text = response.content.trim();
            if text.is_empty() {
                warn!("generation returned an empty response");
                Generation::Failed("empty response".to_string())
            } else {
                Generation::Text(text.to_string())
            }
        }
        Err(e) => {
            warn!("generation failed: {:#}", e);
            Generation::Failed(format!("{:#}", e))
        }
    }
}

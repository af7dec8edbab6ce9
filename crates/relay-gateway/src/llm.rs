use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use relay_types::config::GenerationConfig;
use relay_types::error::PipelineError;
use relay_types::message::{ChatMessage, GenerationRequest};

use crate::system_prompt::build_messages;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce reply text for one request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, PipelineError>;
}

// ─── Request types ────────────────────────────────────────────────────────────

/// OpenAI-style chat completion request. Sampling parameters are left to the
/// provider's defaults.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}

impl ChatResponse {
    /// Text of the first choice, if the provider returned any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(config: &GenerationConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    /// Non-streaming chat request.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, PipelineError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!("API error ({status}): {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::Generation(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl Generator for OpenRouterClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, PipelineError> {
        let chat = ChatRequest {
            model: self.model.clone(),
            messages: build_messages(request),
        };
        let response = self.chat(&chat).await?;

        if let Some(usage) = &response.usage {
            info!(
                "LLM: {} prompt / {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Generation("response contained no text".to_string()))
    }
}

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use summarist_common::{Result, SummaristError};
use tracing::{debug, info};

use crate::llm_trait::{CompletionClient, RetryPolicy};
use crate::tokens::TokenCounter;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, CompletionRequest};

/// OpenAI-compatible chat-completions client
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
    retry: RetryPolicy,
    tokens: TokenCounter,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("retry", &self.retry)
            .finish()
    }
}

impl OpenAiClient {
    /// Create new client; `base_url` is the API root (e.g. `https://api.openai.com/v1`)
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("OpenAI client initialized: {} (model: {})", base_url, model);
        Ok(Self {
            tokens: TokenCounter::for_openai_model(&model),
            base_url,
            api_key: api_key.into(),
            model,
            client,
            retry: RetryPolicy::none(),
        })
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn chat_request<'a>(request: &'a CompletionRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage::system(system.as_str()));
        }
        messages.push(ChatMessage::user(request.prompt.as_str()));

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_tokens: request.options.max_tokens,
        }
    }

    /// Single attempt to generate text
    async fn try_complete(&self, url: &str, body: &ChatRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| SummaristError::completion(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummaristError::completion(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummaristError::completion(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = result.usage {
            debug!(
                "Token usage - prompt: {}, completion: {}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        result
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| SummaristError::completion("Empty response from OpenAI"))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::chat_request(request);

        debug!(
            "Sending chat request - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        self.retry
            .run("OpenAI request", || self.try_complete(&url, &body))
            .await
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.tokens.count(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use summarist_common::{Result, SummaristError};
use tracing::{debug, info};

use crate::llm_trait::{CompletionClient, RetryPolicy};
use crate::tokens::TokenCounter;
use crate::types::{CompletionRequest, OllamaGenerateRequest, OllamaGenerateResponse};

/// Ollama API client
#[derive(Debug)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
    retry: RetryPolicy,
    tokens: TokenCounter,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Ollama client initialized: {} (model: {})", base_url, model);
        Ok(Self {
            base_url,
            model,
            client,
            retry: RetryPolicy::none(),
            tokens: TokenCounter::approximate(),
        })
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Single attempt to generate text
    async fn try_generate(&self, url: &str, request: &OllamaGenerateRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| SummaristError::completion(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummaristError::completion(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let result: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| SummaristError::completion(format!("Failed to parse response: {}", e)))?;

        if result.response.is_empty() {
            return Err(SummaristError::completion("Empty response from Ollama"));
        }

        Ok(result.response)
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: request.options.into(),
        };

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        let response = self
            .retry
            .run("Ollama request", || self.try_generate(&url, &body))
            .await?;

        debug!("Received response from Ollama - Length: {}", response.len());
        Ok(response)
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.tokens.count(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

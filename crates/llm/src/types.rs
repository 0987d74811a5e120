use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use summarist_common::SummaristError;

/// Provider-neutral completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model name (e.g., "gpt-3.5-turbo", "llama3.2")
    pub model: String,

    /// Optional system message
    pub system: Option<String>,

    /// Instantiated prompt text
    pub prompt: String,

    /// Generation options
    pub options: GenerateOptions,
}

/// Generation options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct GenerateOptions {
    /// Temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
pub struct OllamaGenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub stream: bool,
    pub options: OllamaOptions,
}

/// Ollama sampling options
#[derive(Debug, Clone, Serialize, Default)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl From<GenerateOptions> for OllamaOptions {
    fn from(options: GenerateOptions) -> Self {
        Self {
            temperature: options.temperature,
            top_p: options.top_p,
            num_predict: options.max_tokens,
        }
    }
}

/// Ollama generate response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaGenerateResponse {
    /// Generated text
    pub response: String,
}

/// Chat message for the chat-completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completions request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Chat-completions response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Token usage reported by the service
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Summarization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One prompt over the entire input
    SinglePass,
    /// Summarize each chunk, then combine the partial summaries
    MapReduce,
    /// Fold chunks into a running summary, one at a time
    Refine,
}

impl FromStr for Strategy {
    type Err = SummaristError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "single-pass" | "single" | "stuff" => Ok(Self::SinglePass),
            "map-reduce" | "mapreduce" => Ok(Self::MapReduce),
            "refine" => Ok(Self::Refine),
            other => Err(SummaristError::config(format!(
                "Unknown strategy '{}' (expected single-pass, map-reduce or refine)",
                other
            ))),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePass => write!(f, "single-pass"),
            Self::MapReduce => write!(f, "map-reduce"),
            Self::Refine => write!(f, "refine"),
        }
    }
}

/// Summarization result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Final summary text
    pub text: String,

    /// Model used
    pub model: String,

    /// Strategy that produced the summary
    pub strategy: Strategy,

    /// Number of chunks summarized
    pub chunks: usize,

    /// Completion calls issued
    pub calls: usize,

    /// When the summary was produced
    pub created_at: DateTime<Utc>,
}

impl Summary {
    /// Create new summary
    pub fn new(text: String, model: String, strategy: Strategy, chunks: usize, calls: usize) -> Self {
        Self {
            text,
            model,
            strategy,
            chunks,
            calls,
            created_at: Utc::now(),
        }
    }
}

/// Pre-flight token count against the model's input budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenBudget {
    /// Tokens in the text
    pub tokens: usize,

    /// Model input budget
    pub limit: usize,
}

impl TokenBudget {
    /// Whether the text fits the budget
    pub fn fits(&self) -> bool {
        self.tokens <= self.limit
    }
}

//! Summarist LLM Integration
//!
//! Completion clients, text chunking, prompt templates and the summarization pipeline

mod chunking;
mod client;
mod llm_trait;
mod openai_client;
mod prompts;
mod summarize;
mod tokens;
mod types;

pub use chunking::{chunk_text, TextChunk, TextSplitter, DEFAULT_SEPARATORS};
pub use client::OllamaClient;
pub use llm_trait::{CompletionClient, RetryPolicy};
pub use openai_client::OpenAiClient;
pub use prompts::{
    FormatMode, PromptSet, PromptTemplate, COMBINE_PROMPT, MAP_PROMPT, REFINE_PROMPT,
    SINGLE_PASS_PROMPT, SPEECH_CHUNK_PROMPT, SPEECH_COMBINE_PROMPT, SPEECH_SYSTEM_PROMPT,
    STUFF_PROMPT, TRANSLATE_PROMPT,
};
pub use summarize::{Summarizer, SummarizerConfig};
pub use tokens::TokenCounter;
pub use types::{CompletionRequest, GenerateOptions, Strategy, Summary, TokenBudget};

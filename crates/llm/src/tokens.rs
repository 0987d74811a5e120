//! Token counting for pre-flight checks

use std::fmt;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Approximate: 1 token ≈ 4 characters
pub const CHARS_PER_TOKEN: usize = 4;

/// Counts tokens for a model
pub enum TokenCounter {
    /// Byte-pair encoding of the model
    Bpe(CoreBPE),
    /// Character-based estimate for models without a known encoding
    Approximate {
        /// Characters counted as one token
        chars_per_token: usize,
    },
}

impl TokenCounter {
    /// Exact counter for an OpenAI model, `cl100k_base` for unknown models
    pub fn for_openai_model(model: &str) -> Self {
        match tiktoken_rs::get_bpe_from_model(model).or_else(|_| tiktoken_rs::cl100k_base()) {
            Ok(bpe) => Self::Bpe(bpe),
            Err(e) => {
                debug!("No BPE available for {}: {}. Using estimate", model, e);
                Self::approximate()
            }
        }
    }

    /// Character-based estimate
    pub fn approximate() -> Self {
        Self::Approximate {
            chars_per_token: CHARS_PER_TOKEN,
        }
    }

    /// Count tokens in text
    pub fn count(&self, text: &str) -> usize {
        match self {
            Self::Bpe(bpe) => bpe.encode_with_special_tokens(text).len(),
            Self::Approximate { chars_per_token } => {
                text.chars().count().div_ceil((*chars_per_token).max(1))
            }
        }
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bpe(_) => f.write_str("TokenCounter::Bpe"),
            Self::Approximate { chars_per_token } => f
                .debug_struct("TokenCounter::Approximate")
                .field("chars_per_token", chars_per_token)
                .finish(),
        }
    }
}

use crate::error::SummaristError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Completion service backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI-compatible chat completions API
    OpenAi,
    /// Local Ollama server
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = SummaristError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(SummaristError::config(format!(
                "Unknown LLM provider '{}' (expected openai or ollama)",
                other
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Summarist application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service backend
    pub provider: LlmProvider,

    /// OpenAI API key
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    pub openai_base_url: String,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Completion model name
    pub llm_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens per completion
    pub max_tokens: Option<u32>,

    /// HTTP timeout per completion call, in seconds
    pub timeout_secs: u64,

    /// Attempts per completion call (1 = no retry)
    pub max_attempts: u32,

    /// Model input budget in tokens, used by the pre-flight check
    pub context_window: usize,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Concurrent map-phase calls
    pub map_concurrency: usize,

    /// Log directory (console only when unset)
    pub log_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("openai_base_url", &self.openai_base_url)
            .field("ollama_base_url", &self.ollama_base_url)
            .field("llm_model", &self.llm_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("context_window", &self.context_window)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("map_concurrency", &self.map_concurrency)
            .field("log_dir", &self.log_dir)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            llm_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: 300,
            max_attempts: 1,
            context_window: 4096,
            chunk_size: 10_000,
            chunk_overlap: 20,
            map_concurrency: 1,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, SummaristError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();

        let provider = match std::env::var("LLM_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.provider,
        };

        let config = Self {
            provider,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or(defaults.openai_base_url),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or(defaults.ollama_base_url),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            temperature: Self::get_env_parsed("LLM_TEMPERATURE")?
                .unwrap_or(defaults.temperature),
            max_tokens: Self::get_env_parsed("LLM_MAX_TOKENS")?,
            timeout_secs: Self::get_env_parsed("LLM_TIMEOUT_SECS")?
                .unwrap_or(defaults.timeout_secs),
            max_attempts: Self::get_env_parsed("LLM_MAX_ATTEMPTS")?
                .unwrap_or(defaults.max_attempts),
            context_window: Self::get_env_parsed("CONTEXT_WINDOW")?
                .unwrap_or(defaults.context_window),
            chunk_size: Self::get_env_parsed("CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
            chunk_overlap: Self::get_env_parsed("CHUNK_OVERLAP")?
                .unwrap_or(defaults.chunk_overlap),
            map_concurrency: Self::get_env_parsed("MAP_CONCURRENCY")?
                .unwrap_or(defaults.map_concurrency),
            log_dir: Self::get_env_path("LOG_DIR"),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    /// Parse an optional environment variable, rejecting malformed values
    fn get_env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, SummaristError> {
        match std::env::var(key) {
            Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                SummaristError::config(format!("{} has an invalid value: '{}'", key, raw))
            }),
            Err(_) => Ok(None),
        }
    }

    /// Base URL of the configured provider
    pub fn base_url(&self) -> &str {
        match self.provider {
            LlmProvider::OpenAi => &self.openai_base_url,
            LlmProvider::Ollama => &self.ollama_base_url,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SummaristError> {
        if self.llm_model.trim().is_empty() {
            return Err(SummaristError::config("LLM model name cannot be empty"));
        }

        for url in [&self.openai_base_url, &self.ollama_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SummaristError::config(format!(
                    "Base URL must start with http:// or https://: {}",
                    url
                )));
            }
        }

        if self.provider == LlmProvider::OpenAi && self.openai_api_key.is_none() {
            return Err(SummaristError::config(
                "OPENAI_API_KEY must be set for the openai provider",
            ));
        }

        if self.chunk_size == 0 {
            return Err(SummaristError::config("Chunk size must be greater than 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(SummaristError::config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.map_concurrency == 0 {
            return Err(SummaristError::config("Map concurrency must be at least 1"));
        }

        if self.max_attempts == 0 {
            return Err(SummaristError::config("LLM_MAX_ATTEMPTS must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.chunk_overlap, 20);
        assert_eq!(config.llm_model, "gpt-3.5-turbo");
        assert_eq!(config.map_concurrency, 1);
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let mut invalid_config = valid_config();
        invalid_config.llm_model = String::new();
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_validate_chunking() {
        let mut config = valid_config();
        config.chunk_overlap = config.chunk_size;
        assert!(matches!(
            config.validate(),
            Err(SummaristError::InvalidConfiguration(_))
        ));

        let mut config = valid_config();
        config.chunk_size = 0;
        config.chunk_overlap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_api_key_for_openai() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());

        let config = AppConfig {
            provider: LlmProvider::Ollama,
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert!("bard".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let rendered = format!("{:?}", valid_config());
        assert!(!rendered.contains("sk-test"));
    }
}

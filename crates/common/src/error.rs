/// Summarist error types
#[derive(Debug, thiserror::Error)]
pub enum SummaristError {
    /// Bad chunk size/overlap or other configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Nothing to summarize
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Template references a placeholder with no bound value
    #[error("Missing value for placeholder '{name}'")]
    MissingPlaceholder { name: String },

    /// Strict formatting received a value the template never uses
    #[error("Unused value for '{name}'")]
    UnusedValue { name: String },

    /// Template text could not be parsed
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Failure reported by the completion service, passed through unchanged
    #[error("Completion service error: {0}")]
    CompletionService(String),

    /// PDF text extraction failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Summarization was cancelled by the caller
    #[error("Summarization cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SummaristError {
    /// Create configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create empty input error
    pub fn empty_input<S: Into<String>>(msg: S) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create missing placeholder error
    pub fn missing_placeholder<S: Into<String>>(name: S) -> Self {
        Self::MissingPlaceholder { name: name.into() }
    }

    /// Create unused value error
    pub fn unused_value<S: Into<String>>(name: S) -> Self {
        Self::UnusedValue { name: name.into() }
    }

    /// Create invalid template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTemplate(msg.into())
    }

    /// Create completion service error
    pub fn completion<S: Into<String>>(msg: S) -> Self {
        Self::CompletionService(msg.into())
    }

    /// Create extraction error
    pub fn extraction<S: Into<String>>(msg: S) -> Self {
        Self::Extraction(msg.into())
    }

    /// Whether a retry policy may re-issue the failed call
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CompletionService(_))
    }
}

// Process exit status for the CLI driver
impl SummaristError {
    /// Get process exit code (never 0)
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfiguration(_) => 2,
            Self::MissingPlaceholder { .. } => 2,
            Self::UnusedValue { .. } => 2,
            Self::InvalidTemplate(_) => 2,
            Self::EmptyInput(_) => 3,
            Self::CompletionService(_) => 4,
            Self::Extraction(_) => 5,
            Self::Cancelled => 130,
            Self::Io(_) => 1,
            Self::Json(_) => 1,
            Self::Other(_) => 1,
        }
    }
}

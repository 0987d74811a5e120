pub mod config;
pub mod document;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, LlmProvider};
pub use document::Document;
pub use error::SummaristError;
pub type Result<T> = std::result::Result<T, SummaristError>;

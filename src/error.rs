//! Error types for the investment assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Domain Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Brokerage error: {0}")]
    Brokerage(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("News search error: {0}")]
    NewsSearch(String),

    #[error("Filings error: {0}")]
    Filings(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

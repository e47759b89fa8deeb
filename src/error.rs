//! Error types for the financial research assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Core Loop Errors
    // =============================

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Session error: {0}")]
    Session(String),

    // =============================
    // Market Data Errors
    // =============================

    #[error("No data found for ticker {0}")]
    NoData(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    // =============================
    // Startup Errors
    // =============================

    #[error("{0} not found in environment variables")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

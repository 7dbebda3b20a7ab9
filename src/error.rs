//! Error types for Kino.

use thiserror::Error;

/// Library-level error type for Kino operations.
#[derive(Error, Debug)]
pub enum KinoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM backend error: {0}")]
    Llm(String),

    #[error("Web search error: {0}")]
    Search(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Kino operations.
pub type Result<T> = std::result::Result<T, KinoError>;

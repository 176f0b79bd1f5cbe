//! Error types for the careline chatbot.
//!
//! One crate-wide error enum; the per-stage failure taxonomy lives next to
//! the pipeline orchestrator, which maps any of these into a recorded
//! diagnostic instead of aborting the turn.

use thiserror::Error;

/// Main error type for the chatbot system
#[derive(Error, Debug)]
pub enum ChatError {
    /// LLM completion API errors (non-2xx, malformed body)
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Streaming transport or chunk decoding errors
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store errors
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Dataset ingestion errors
    #[error("Ingestion error: {0}")]
    Ingest(String),

    /// Transcript log errors
    #[error("History error: {0}")]
    History(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for chatbot operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Convert anyhow errors from plumbing code
impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::Other(err.to_string())
    }
}

impl From<csv::Error> for ChatError {
    fn from(err: csv::Error) -> Self {
        ChatError::History(err.to_string())
    }
}

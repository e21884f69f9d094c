//! Error types for the to-do service.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    /// Task-list persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Language model generation error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TodoError>;

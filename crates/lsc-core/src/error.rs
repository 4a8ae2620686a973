use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// A clause that has no SQL form reached the compiler
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Caller-supplied field/operator/value combination that cannot be compiled
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl QueryError {
    /// Build an [`QueryError::Unsupported`]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        QueryError::Unsupported(msg.into())
    }

    /// Build an [`QueryError::InvalidArgument`]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        QueryError::InvalidArgument(msg.into())
    }
}

/// Result type for compile and configuration operations
pub type Result<T> = std::result::Result<T, QueryError>;

//! Error types for veracity.

use thiserror::Error;

/// Result type for veracity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for veracity operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An annotation carried a boxed label outside the recognized set.
    ///
    /// This is a contract violation and is never coerced: the caller decides
    /// whether to skip the item or abort the batch.
    #[error("Invalid label: {0:?} (expected \"real\" or \"ai-generated\")")]
    InvalidLabel(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Judge endpoint failure that cannot degrade to a zero score
    /// (missing credentials, unusable endpoint configuration).
    #[error("Judge error: {0}")]
    Judge(String),

    /// Model retrieval error (downloading from HuggingFace).
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Model inference failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Feature not available.
    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),
}

impl Error {
    /// Create an invalid label error.
    pub fn invalid_label(label: impl Into<String>) -> Self {
        Error::InvalidLabel(label.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a judge error.
    pub fn judge(msg: impl Into<String>) -> Self {
        Error::Judge(msg.into())
    }

    /// Create a retrieval error.
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Error::Retrieval(msg.into())
    }

    /// Create an inference error.
    pub fn inference(msg: impl Into<String>) -> Self {
        Error::Inference(msg.into())
    }

    /// Create a feature not available error.
    pub fn feature_not_available(feature: impl Into<String>) -> Self {
        Error::FeatureNotAvailable(feature.into())
    }
}

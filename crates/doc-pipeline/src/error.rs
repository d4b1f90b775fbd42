//! Error types for the document pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed upstream error, kept as-is so its message and source chain survive
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing or malformed setting)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The fetched object had no body, or an empty one
    #[error("No document content found")]
    EmptyContent { bucket: String, key: String },

    /// Object key could not be URL-decoded
    #[error("Failed to decode object key '{key}': {message}")]
    KeyDecode { key: String, message: String },

    /// Object storage failure, passed through unchanged
    #[error(transparent)]
    ObjectStore(BoxError),

    /// Inference endpoint failure, passed through unchanged
    #[error(transparent)]
    Inference(BoxError),

    /// Record store failure, passed through unchanged
    #[error(transparent)]
    RecordStore(BoxError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an empty-content error for the given object
    pub fn empty_content(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::EmptyContent {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a key decoding error
    pub fn key_decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KeyDecode {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap an object storage failure
    pub fn object_store(err: impl Into<BoxError>) -> Self {
        Self::ObjectStore(err.into())
    }

    /// Wrap an inference endpoint failure
    pub fn inference(err: impl Into<BoxError>) -> Self {
        Self::Inference(err.into())
    }

    /// Wrap a record store failure
    pub fn record_store(err: impl Into<BoxError>) -> Self {
        Self::RecordStore(err.into())
    }

    /// Pipeline stage the error belongs to, for log fields
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::EmptyContent { .. } | Error::KeyDecode { .. } => "validate",
            Error::ObjectStore(_) => "fetch",
            Error::Inference(_) => "inference",
            Error::RecordStore(_) => "store",
            Error::Io(_) | Error::Json(_) | Error::Http(_) => "internal",
        }
    }
}

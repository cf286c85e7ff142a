//! Unified error types for the shortlink service.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the shortlink service.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration; fatal at construction time.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("url is required")]
    EmptyUrl,

    #[error("invalid url format")]
    InvalidUrlFormat,

    #[error("url protocol not allowed")]
    UnsafeProtocol,

    #[error("url exceeds maximum length")]
    UrlTooLong,

    #[error("private ip addresses not allowed")]
    PrivateIpNotAllowed,

    #[error("urls is required")]
    EmptyBatch,

    #[error("batch size exceeds maximum")]
    BatchTooLarge,

    /// Per-index validation failures in a batch request.
    #[error("batch validation failed")]
    BatchValidation(Vec<(usize, Box<Error>)>),

    #[error("url not found")]
    NotFound,

    #[error("short code error: {0}")]
    ShortCode(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("sink write failed: {0}")]
    Sink(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::EmptyUrl
            | Self::InvalidUrlFormat
            | Self::UnsafeProtocol
            | Self::UrlTooLong
            | Self::PrivateIpNotAllowed
            | Self::EmptyBatch
            | Self::BatchTooLarge
            | Self::BatchValidation(_) => 400,
            Self::NotFound => 404,
            Self::Config(_)
            | Self::ShortCode(_)
            | Self::Database(_)
            | Self::Sink(_)
            | Self::Serialization(_)
            | Self::Internal(_) => 500,
        }
    }
}

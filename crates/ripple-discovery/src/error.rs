//! Consumer discovery error types

use ripple_domain::ErrorCode;
use thiserror::Error;

/// Errors that can occur while searching a repository for consumers
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Repository could not be located, cloned or opened
    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// Hosted search refused the request (HTTP 403/429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Hosted search returned an unexpected status
    #[error("Search API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Invalid discovery configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Search task panicked or was aborted
    #[error("Search task failed: {0}")]
    TaskFailed(String),

    #[error("Git error: {0}")]
    GitError(#[from] git2::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid search pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DiscoveryError {
    /// Create an API error from a status and body
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        DiscoveryError::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Every discovery failure is absorbed as a partial search
    pub fn code(&self) -> Option<ErrorCode> {
        Some(ErrorCode::SearchIncomplete)
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, DiscoveryError::RateLimited(_))
    }
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

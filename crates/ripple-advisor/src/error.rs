//! Semantic advisor error types

use ripple_domain::ErrorCode;
use thiserror::Error;

/// Errors that can occur while calling the semantic advisor
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Advisor API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Advisor call timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid advisor response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AdvisorError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        AdvisorError::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Network failures, timeouts and 5xx responses are worth one retry
    pub fn is_transient(&self) -> bool {
        match self {
            AdvisorError::HttpError(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.status().is_some_and(|s| s.is_server_error())
            }
            AdvisorError::ApiError { status, .. } => *status >= 500,
            AdvisorError::Timeout(_) => true,
            _ => false,
        }
    }

    /// An advisor failure only ever degrades an analysis
    pub fn code(&self) -> Option<ErrorCode> {
        Some(ErrorCode::SemanticAdvisorDegraded)
    }
}

/// Result type for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;
